pub mod analytic;
pub mod facets;
pub mod level;
pub mod order;

#[cfg(test)]
#[path = "../../tests/src_inline/model/tests.rs"]
mod tests;
