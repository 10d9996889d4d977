use std::fs;

use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn test_parse_enrich() {
    let cli = parse(&[
        "diagnostica-rollup",
        "enrich",
        "--data-dir",
        "data",
        "--out",
        "out",
        "--rebuild",
    ]);
    match cli.command {
        Command::Enrich { common } => {
            assert_eq!(common.data_dir, PathBuf::from("data"));
            assert_eq!(common.out, PathBuf::from("out"));
            assert!(common.rebuild);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_query_with_repeated_facets() {
    let cli = parse(&[
        "diagnostica-rollup",
        "query",
        "--data-dir",
        "data",
        "--out",
        "out",
        "--grado",
        "3",
        "--grado",
        "4",
        "--proceso",
        "Comprensión",
        "--sort",
        "lowest",
    ]);
    let Command::Query { facets, sort, common } = cli.command else {
        panic!("expected query");
    };
    assert!(!common.rebuild);
    assert_eq!(sort, SortMode::Lowest);

    let selection = facets.to_selection().unwrap();
    let grades = selection.constraint(Facet::Grado).unwrap();
    assert_eq!(grades.len(), 2);
    assert!(grades.contains("4"));
    assert!(selection.constraint(Facet::Nivel).is_none());
}

#[test]
fn test_parse_query_with_stratum_and_criterion() {
    let cli = parse(&[
        "diagnostica-rollup",
        "query",
        "--data-dir",
        "data",
        "--out",
        "out",
        "--servicio",
        "General",
        "--criterio",
        "C1",
        "--criterio",
        "C2",
        "--sort",
        "process_difficulty",
    ]);
    let Command::Query { facets, sort, .. } = cli.command else {
        panic!("expected query");
    };
    assert_eq!(sort, SortMode::ProcessDifficulty);

    let selection = facets.to_selection().unwrap();
    assert!(selection.constraint(Facet::Servicio).unwrap().contains("General"));
    assert_eq!(selection.constraint(Facet::Criterio).unwrap().len(), 2);
    assert!(selection.constraint(Facet::Eia).is_none());
}

#[test]
fn test_query_sort_defaults_to_natural() {
    let cli = parse(&["diagnostica-rollup", "query", "--data-dir", "d", "--out", "o"]);
    let Command::Query { sort, facets, .. } = cli.command else {
        panic!("expected query");
    };
    assert_eq!(sort, SortMode::Natural);
    assert!(facets.to_selection().unwrap().is_unrestricted());
}

#[test]
fn test_parse_cut_with_negative_threshold() {
    let cli = parse(&[
        "diagnostica-rollup",
        "cut",
        "--data-dir",
        "data",
        "--out",
        "out",
        "--nivel",
        "Primaria",
        "--grado",
        "3",
        "--eia-clave",
        "U1",
        "--threshold",
        "-1.5",
        "--criterio",
        "C1",
    ]);
    let Command::Cut {
        nivel,
        grado,
        eia_clave,
        threshold,
        proceso,
        criterio,
        ..
    } = cli.command
    else {
        panic!("expected cut");
    };
    assert_eq!(nivel, "Primaria");
    assert_eq!(grado, 3);
    assert_eq!(eia_clave.as_deref(), Some("U1"));
    assert_eq!(threshold, -1.5);
    assert!(proceso.is_empty());
    assert_eq!(criterio, ["C1"]);
}

#[test]
fn test_cut_requires_threshold() {
    let err = Cli::try_parse_from([
        "diagnostica-rollup",
        "cut",
        "--data-dir",
        "data",
        "--out",
        "out",
        "--nivel",
        "Primaria",
        "--grado",
        "3",
    ]);
    assert!(err.is_err());
}

#[test]
fn test_unknown_sort_mode_rejected() {
    let err = Cli::try_parse_from([
        "diagnostica-rollup",
        "query",
        "--data-dir",
        "d",
        "--out",
        "o",
        "--sort",
        "random",
    ]);
    assert!(err.is_err());
}

#[test]
fn test_selection_file_with_flag_override() {
    let dir = std::env::temp_dir().join(format!("diagnostica_main_test_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("selection.json");
    fs::write(
        &path,
        r#"{"facets":{"nivel":{"chosen":["Primaria"]},"grado":{"chosen":["3"]}}}"#,
    )
    .unwrap();

    let facets = FacetArgs {
        grado: vec!["5".to_string()],
        selection: Some(path),
        ..FacetArgs::default()
    };
    let selection = facets.to_selection().unwrap();
    assert!(selection.constraint(Facet::Nivel).unwrap().contains("Primaria"));
    let grades = selection.constraint(Facet::Grado).unwrap();
    assert_eq!(grades.len(), 1);
    assert!(grades.contains("5"));
}

#[test]
fn test_bad_selection_file_is_selection_error() {
    let dir = std::env::temp_dir().join(format!("diagnostica_main_bad_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("selection.json");
    fs::write(&path, "[1, 2]").unwrap();

    let facets = FacetArgs {
        selection: Some(path),
        ..FacetArgs::default()
    };
    assert!(matches!(
        facets.to_selection(),
        Err(PipelineError::Selection(_))
    ));
}
