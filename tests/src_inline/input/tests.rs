use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::cache::{format_hash, hash_file};
use super::dictionary::{parse_items, parse_rubric};
use super::facts::{PropScale, parse_counts, parse_irt, parse_means};
use super::persons::{load_histogram, load_persons};
use super::table::{is_null, read_table};
use super::{InputError, SourcePaths, TableKind, find_table_path, load_sources};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("diagnostica_input_test_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    let mut f = BufWriter::new(File::create(path).unwrap());
    f.write_all(contents.as_bytes()).unwrap();
}

/// Log sink for asserting on emitted events.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs.contents())
}

fn write_gz(path: &Path, contents: &str) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

const DICTIONARY: &str = "item\tfase\teia\teia_clave\tcampo\tproceso\tcontenido\tpda\tdescriptor\tcriterio\tconsigna\tinciso\tcriterio_num\n\
I1\t3\tUnidad A\tU1\tLenguajes\tComprensión\tLectura\tPDA 1\tIdentifica ideas\tC1\t1\ta\t1\n\
I2\t3\tUnidad B\tNA\tSaberes y pensamiento científico\tAnálisis\t\t\tCompara datos\tC2\t2.0\tb\t2\n";

const RUBRIC: &str = "item\tresp\tresp_nivel\tresp_rubrica\n\
I1\tN0\tSin evidencias\tNo responde\n\
I1\tN3\tDesarrollado\tResponde completo\n";

const COUNTS: &str = "item\tnivel\tgrado\tresp\tprop\n\
I1\tPrimaria\t3\tN0\t10\n\
I1\tPrimaria\t3\tN1\t20\n\
I1\tPrimaria\t3\tN2\t30\n\
I1\tPrimaria\t3\tN3\t40\n";

const MEANS: &str = "item\tgrado\tmedia\nI1\t3\t2.0\n";

const IRT: &str = "item\tgrado\tresp\tdificultad\tdificultad_se\nI1\t3\tN3\t0.75\t0.1\n";

const PERSONS: &str = "nivel\tgrado\teia_clave\tcuantil\tpuntaje\nPrimaria\t3\tU1\t10\t-1.0\nPrimaria\t3\tU1\t50\t0.0\n";

const HISTOGRAM: &str = "nivel\tgrado\teia_clave\tdificultad\tconteo\nPrimaria\t3\tU1\t-0.5\t12\n";

fn write_data_dir(dir: &Path) {
    write_file(&dir.join("diccionario.tsv"), DICTIONARY);
    write_file(&dir.join("diccionario_rubrica.tsv"), RUBRIC);
    write_gz(&dir.join("item_conteo_grado.tsv.gz"), COUNTS);
    write_file(&dir.join("item_medias.tsv"), MEANS);
    write_file(&dir.join("item_irt_eia.tsv"), IRT);
    write_file(&dir.join("personas_uni.tsv"), PERSONS);
    write_file(&dir.join("personas_dist.tsv"), HISTOGRAM);
}

#[test]
fn test_read_table_plain_and_gz() {
    let dir = make_temp_dir();
    let plain = dir.join("plain.tsv");
    let gz = dir.join("packed.tsv.gz");
    let contents = "\u{feff}item\tmedia\r\nI1\t1.5\r\n\r\nI2\t2\n";
    write_file(&plain, contents);
    write_gz(&gz, contents);

    for path in [&plain, &gz] {
        let table = read_table(path, TableKind::Means).unwrap();
        assert_eq!(table.columns, vec!["item", "media"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].fields, vec!["I1", "1.5"]);
        // Blank lines are skipped but still counted.
        assert_eq!(table.rows[1].line, 4);
    }
}

#[test]
fn test_empty_file_is_error() {
    let dir = make_temp_dir();
    let path = dir.join("empty.tsv");
    write_file(&path, "");
    let err = read_table(&path, TableKind::Counts).unwrap_err();
    assert!(matches!(err, InputError::Parse(_)));
}

#[test]
fn test_null_tokens() {
    for token in ["", "NA", "NaN", "nan", "null", "None"] {
        assert!(is_null(token), "{token:?} should be null");
    }
    assert!(!is_null("0"));
    assert!(!is_null("N0"));
}

#[test]
fn test_missing_column_names_table_and_column() {
    let dir = make_temp_dir();
    let path = dir.join("item_medias.tsv");
    write_file(&path, "item\tgrado\nI1\t3\n");
    let table = read_table(&path, TableKind::Means).unwrap();
    let err = parse_means(&table).unwrap_err();
    match &err {
        InputError::MissingColumn { table, column } => {
            assert_eq!(*table, TableKind::Means);
            assert_eq!(column, "media");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("item_medias"));
    assert!(msg.contains("`media`"));
}

#[test]
fn test_parse_items_optional_columns_and_float_integers() {
    let dir = make_temp_dir();
    let path = dir.join("diccionario.tsv");
    write_file(&path, DICTIONARY);
    let items = parse_items(&read_table(&path, TableKind::Dictionary).unwrap()).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].eia_clave.as_deref(), Some("U1"));
    assert_eq!(items[0].pda.as_deref(), Some("PDA 1"));
    assert_eq!(items[1].eia_clave, None);
    assert_eq!(items[1].contenido, None);
    assert_eq!(items[1].consigna, 2);
    assert_eq!(items[1].proceso, "Análisis");
}

#[test]
fn test_parse_items_rejects_bad_integer() {
    let dir = make_temp_dir();
    let path = dir.join("diccionario.tsv");
    write_file(
        &path,
        "item\teia\tcampo\tproceso\tdescriptor\tcriterio\tconsigna\tinciso\tcriterio_num\n\
         I1\tU\tLenguajes\tComprensión\td\tc\t1.5\ta\t1\n",
    );
    let err = parse_items(&read_table(&path, TableKind::Dictionary).unwrap()).unwrap_err();
    match err {
        InputError::InvalidValue {
            line, column, value, ..
        } => {
            assert_eq!(line, 2);
            assert_eq!(column, "consigna");
            assert_eq!(value, "1.5");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_rubric_requires_keys() {
    let dir = make_temp_dir();
    let path = dir.join("diccionario_rubrica.tsv");
    write_file(&path, "item\tresp\tresp_nivel\tresp_rubrica\nI1\t\tx\ty\n");
    let err = parse_rubric(&read_table(&path, TableKind::Rubric).unwrap()).unwrap_err();
    assert!(matches!(err, InputError::InvalidValue { .. }));
}

#[test]
fn test_prop_scale_detection() {
    assert_eq!(PropScale::detect([0.1, 0.2, 0.7]), PropScale::Fraction);
    assert_eq!(PropScale::detect([10.0, 0.5, 89.5]), PropScale::Percent);
    assert_eq!(PropScale::detect(std::iter::empty()), PropScale::Percent);
    assert_eq!(PropScale::Fraction.to_percent(0.25), 25.0);
    assert_eq!(PropScale::Percent.to_percent(25.0), 25.0);
}

#[test]
fn test_counts_fraction_scale_normalised() {
    let dir = make_temp_dir();
    let path = dir.join("item_conteo_grado.tsv");
    write_file(
        &path,
        "item\tnivel\tgrado\tresp\tprop\tservicio\n\
         I1\tPrimaria\t3\tN0\t0.1\tGeneral\n\
         I1\tPrimaria\t3\tN3\t0.9\tNA\n",
    );
    let table = read_table(&path, TableKind::Counts).unwrap();
    let ((counts, scale), logs) = with_captured_logs(|| parse_counts(&table).unwrap());
    assert_eq!(scale, PropScale::Fraction);
    assert!(logs.contains("WARN"));
    assert!(logs.contains("reading the count table as fractions"));
    assert!((counts[0].prop - 10.0).abs() < 1e-9);
    assert!((counts[1].prop - 90.0).abs() < 1e-9);
    assert_eq!(counts[0].servicio.as_deref(), Some("General"));
    assert_eq!(counts[1].servicio, None);
}

#[test]
fn test_counts_percent_scale_is_silent() {
    let dir = make_temp_dir();
    let path = dir.join("item_conteo_grado.tsv");
    write_file(
        &path,
        "item\tnivel\tgrado\tresp\tprop\n\
         I1\tPrimaria\t3\tN0\t0.5\n\
         I1\tPrimaria\t3\tN3\t99.5\n",
    );
    let table = read_table(&path, TableKind::Counts).unwrap();
    let ((counts, scale), logs) = with_captured_logs(|| parse_counts(&table).unwrap());
    assert_eq!(scale, PropScale::Percent);
    assert_eq!(counts[0].prop, 0.5);
    assert!(!logs.contains("fractions"));
}

#[test]
fn test_counts_out_of_range_rejected() {
    let dir = make_temp_dir();
    let path = dir.join("item_conteo_grado.tsv");
    write_file(
        &path,
        "item\tnivel\tgrado\tresp\tprop\nI1\tPrimaria\t3\tN0\t120\n",
    );
    let err = parse_counts(&read_table(&path, TableKind::Counts).unwrap()).unwrap_err();
    match err {
        InputError::InvalidValue { table, column, .. } => {
            assert_eq!(table, TableKind::Counts);
            assert_eq!(column, "prop");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_means_out_of_range_rejected() {
    let dir = make_temp_dir();
    let path = dir.join("item_medias.tsv");
    write_file(&path, "item\tgrado\tmedia\nI1\t3\t3.5\n");
    let err = parse_means(&read_table(&path, TableKind::Means).unwrap()).unwrap_err();
    assert!(err.to_string().contains("media"));
}

#[test]
fn test_irt_resp_optional() {
    let dir = make_temp_dir();
    let path = dir.join("item_irt_eia.tsv");
    write_file(&path, "item\tgrado\tdificultad\nI1\t3\t-0.4\n");
    let irt = parse_irt(&read_table(&path, TableKind::Irt).unwrap()).unwrap();
    assert_eq!(irt.len(), 1);
    assert_eq!(irt[0].resp, None);
    assert_eq!(irt[0].dificultad_se, None);
    assert!((irt[0].dificultad + 0.4).abs() < 1e-12);
}

#[test]
fn test_find_table_path_prefers_plain_then_gz() {
    let dir = make_temp_dir();
    assert!(matches!(
        find_table_path(&dir, TableKind::Means),
        Err(InputError::MissingInput(_))
    ));
    write_gz(&dir.join("item_medias.tsv.gz"), MEANS);
    assert_eq!(
        find_table_path(&dir, TableKind::Means).unwrap(),
        dir.join("item_medias.tsv.gz")
    );
    write_file(&dir.join("item_medias.tsv"), MEANS);
    assert_eq!(
        find_table_path(&dir, TableKind::Means).unwrap(),
        dir.join("item_medias.tsv")
    );
}

#[test]
fn test_resolve_and_load_sources() {
    let dir = make_temp_dir();
    write_data_dir(&dir);
    let paths = SourcePaths::resolve(&dir).unwrap();
    assert_eq!(paths.counts, dir.join("item_conteo_grado.tsv.gz"));

    let sources = load_sources(&paths).unwrap();
    assert_eq!(sources.items.len(), 2);
    assert_eq!(sources.rubric.len(), 2);
    assert_eq!(sources.counts.len(), 4);
    assert_eq!(sources.count_scale, PropScale::Percent);
    assert_eq!(sources.means.len(), 1);
    assert_eq!(sources.irt[0].resp.as_deref(), Some("N3"));
}

#[test]
fn test_resolve_missing_dir() {
    let dir = make_temp_dir().join("absent");
    assert!(matches!(
        SourcePaths::resolve(&dir),
        Err(InputError::MissingInput(_))
    ));
}

#[test]
fn test_load_persons_and_histogram() {
    let dir = make_temp_dir();
    write_data_dir(&dir);
    let persons = load_persons(&dir.join("personas_uni.tsv")).unwrap();
    assert_eq!(persons.len(), 2);
    assert_eq!(persons[1].cuantil, 50.0);
    assert_eq!(persons[1].eia_clave.as_deref(), Some("U1"));

    let histogram = load_histogram(&dir.join("personas_dist.tsv")).unwrap();
    assert_eq!(histogram[0].conteo, 12);
    assert_eq!(histogram[0].dificultad, -0.5);
}

#[test]
fn test_hash_file_is_fnv1a() {
    let dir = make_temp_dir();
    let empty = dir.join("empty.tsv");
    let one = dir.join("one.tsv");
    write_file(&empty, "");
    write_file(&one, "a");
    assert_eq!(format_hash(hash_file(&empty).unwrap()), "cbf29ce484222325");
    assert_eq!(format_hash(hash_file(&one).unwrap()), "af63dc4c8601ec8c");
    assert_eq!(format_hash(0xab), "00000000000000ab");
}
