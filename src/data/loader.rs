use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{TreeRecord, TreeTable};

// ---------------------------------------------------------------------------
// Sources and errors
// ---------------------------------------------------------------------------

/// The city's Opendatasoft explore v2.1 records endpoint for public trees.
pub const DEFAULT_API_ENDPOINT: &str =
    "https://opendata.vancouver.ca/api/explore/v2.1/catalog/datasets/public-trees/records";

/// Rows fetched per API request.
const PAGE_SIZE: usize = 100;
/// Hard cap on rows accumulated from the API in one load.
const MAX_API_ROWS: usize = 10_000;

/// Where the table comes from. Both variants converge on the same
/// [`TreeRecord`] schema and the same drop-on-malformed-row policy.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// Local semicolon-delimited CSV in the published open-data layout.
    File(PathBuf),
    /// Paginated remote endpoint, optionally narrowed to one neighbourhood.
    Api {
        endpoint: String,
        neighbourhood: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    /// Endpoint unreachable or non-success HTTP status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local file could not be opened or read.
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing required columns, or an unparsable response body.
    #[error("bad data format: {0}")]
    Format(String),
}

/// The outcome of a successful load: the normalized table plus the number of
/// malformed rows that were dropped (reported, never silently discarded).
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub table: TreeTable,
    pub dropped_rows: usize,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tree table from the given source.
///
/// Load-time errors abort the whole load; individually malformed rows (bad
/// coordinates, empty neighbourhood, unparsable numeric text) are dropped
/// and counted in the returned [`LoadReport`]. Loading is idempotent and
/// deterministic for a fixed input.
pub fn load_table(source: &DataSource) -> Result<LoadReport, LoadError> {
    match source {
        DataSource::File(path) => load_csv(path),
        DataSource::Api {
            endpoint,
            neighbourhood,
        } => load_api(endpoint, neighbourhood.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Column layout of the published CSV export. Headers are matched
/// case-insensitively; `GEO_POINT_2D` holds `"lat, lon"`.
struct CsvColumns {
    neighbourhood: usize,
    common_name: usize,
    species_name: Option<usize>,
    height: Option<usize>,
    diameter: Option<usize>,
    date_planted: Option<usize>,
    coords: CoordColumns,
}

enum CoordColumns {
    GeoPoint(usize),
    LatLon(usize, usize),
}

fn load_csv(path: &Path) -> Result<LoadReport, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(file)
}

/// Parse the CSV export from any reader (exposed for tests).
pub fn parse_csv<R: Read>(reader: R) -> Result<LoadReport, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(b';').from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| LoadError::Format(format!("reading CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_ascii_uppercase())
        .collect();
    let columns = resolve_columns(&headers)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for row in rdr.records() {
        let Ok(row) = row else {
            dropped += 1;
            continue;
        };
        match parse_csv_row(&row, &columns) {
            Some(rec) => records.push(rec),
            None => dropped += 1,
        }
    }

    log::info!("CSV load: {} rows parsed, {dropped} dropped", records.len());
    Ok(LoadReport {
        table: TreeTable::from_records(records),
        dropped_rows: dropped,
    })
}

fn resolve_columns(headers: &[String]) -> Result<CsvColumns, LoadError> {
    let find = |name: &str| headers.iter().position(|h| h == name);

    let neighbourhood = find("NEIGHBOURHOOD_NAME")
        .ok_or_else(|| LoadError::Format("CSV missing NEIGHBOURHOOD_NAME column".into()))?;
    let common_name = find("COMMON_NAME")
        .ok_or_else(|| LoadError::Format("CSV missing COMMON_NAME column".into()))?;

    let coords = if let Some(idx) = find("GEO_POINT_2D") {
        CoordColumns::GeoPoint(idx)
    } else if let (Some(lat), Some(lon)) = (find("LATITUDE"), find("LONGITUDE")) {
        CoordColumns::LatLon(lat, lon)
    } else {
        return Err(LoadError::Format(
            "CSV missing coordinate columns (GEO_POINT_2D or LATITUDE/LONGITUDE)".into(),
        ));
    };

    Ok(CsvColumns {
        neighbourhood,
        common_name,
        species_name: find("SPECIES_NAME"),
        height: find("HEIGHT_RANGE_ID"),
        diameter: find("DIAMETER"),
        date_planted: find("DATE_PLANTED"),
        coords,
    })
}

/// One row → one record; `None` means the row is malformed and gets dropped.
fn parse_csv_row(row: &csv::StringRecord, cols: &CsvColumns) -> Option<TreeRecord> {
    let field = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");
    let opt_field = |idx: Option<usize>| idx.map(field).filter(|s| !s.is_empty());

    let neighbourhood = field(cols.neighbourhood).to_uppercase();
    if neighbourhood.is_empty() {
        return None;
    }

    let (latitude, longitude) = match cols.coords {
        CoordColumns::GeoPoint(idx) => parse_geo_point(field(idx))?,
        CoordColumns::LatLon(lat, lon) => (
            field(lat).parse::<f64>().ok()?,
            field(lon).parse::<f64>().ok()?,
        ),
    };

    // Empty optional fields are "absent" (None); garbage text drops the row.
    let height = parse_opt_f64(opt_field(cols.height))?;
    let diameter = parse_opt_f64(opt_field(cols.diameter))?;
    let planting_year = parse_opt_year(opt_field(cols.date_planted))?;

    Some(TreeRecord {
        neighbourhood,
        common_name: non_empty_or_unknown(field(cols.common_name)),
        species_name: non_empty_or_unknown(opt_field(cols.species_name).unwrap_or("")),
        height,
        diameter,
        planting_year,
        latitude,
        longitude,
    })
}

/// `"49.2531, -123.1234"` → (lat, lon).
fn parse_geo_point(s: &str) -> Option<(f64, f64)> {
    let (lat, lon) = s.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

/// Absent stays absent; a present-but-unparsable value is malformed (the
/// `None` return drops the row rather than coercing to a sentinel number).
fn parse_opt_f64(s: Option<&str>) -> Option<Option<f64>> {
    match s {
        None => Some(None),
        Some(text) => text.parse::<f64>().ok().map(Some),
    }
}

/// `"2012-03-05"` (or any string with a leading 4-digit year) → 2012.
fn parse_opt_year(s: Option<&str>) -> Option<Option<i32>> {
    let Some(text) = s.map(str::trim) else {
        return Some(None);
    };
    if text.is_empty() {
        return Some(None);
    }
    let year = text.get(..4)?.parse::<i32>().ok()?;
    Some(Some(year))
}

fn non_empty_or_unknown(s: &str) -> String {
    if s.is_empty() {
        "Unknown".to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// API loader
// ---------------------------------------------------------------------------

/// Fetch all pages from the records endpoint and accumulate one table.
///
/// Blocks the calling thread; this is an interactive tool with a human in
/// the loop, so a single attempt without retry is enough.
fn load_api(endpoint: &str, neighbourhood: Option<&str>) -> Result<LoadReport, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let mut records = Vec::new();
    let mut dropped = 0usize;
    let mut offset = 0usize;

    loop {
        let mut request = client.get(endpoint).query(&[
            ("limit", PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ]);
        if let Some(hood) = neighbourhood {
            request = request.query(&[("where", where_clause(hood))]);
        }

        let body = request.send()?.error_for_status()?.text()?;
        let page: JsonValue = serde_json::from_str(&body)
            .map_err(|e| LoadError::Format(format!("unparsable API response: {e}")))?;
        let results = page_results(&page)?;

        let page_len = results.len();
        for value in results {
            match parse_api_record(value) {
                Some(rec) => records.push(rec),
                None => dropped += 1,
            }
        }
        log::debug!("API page at offset {offset}: {page_len} records");

        offset += page_len;
        if page_len < PAGE_SIZE || offset >= MAX_API_ROWS {
            break;
        }
    }

    log::info!("API load: {} rows parsed, {dropped} dropped", records.len());
    Ok(LoadReport {
        table: TreeTable::from_records(records),
        dropped_rows: dropped,
    })
}

fn where_clause(neighbourhood: &str) -> String {
    format!("neighbourhood_name='{neighbourhood}'")
}

/// Extract the `results` array from one response page.
fn page_results(page: &JsonValue) -> Result<&Vec<JsonValue>, LoadError> {
    page.get("results")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| LoadError::Format("API response missing 'results' array".into()))
}

/// One API record → one [`TreeRecord`]; `None` drops the record.
///
/// Coordinates come from `geom.geometry.coordinates` ([lon, lat]) with the
/// flat `geo_point_2d` object as fallback, mirroring the published schema.
fn parse_api_record(value: &JsonValue) -> Option<TreeRecord> {
    let obj = value.as_object()?;

    let neighbourhood = obj
        .get("neighbourhood_name")
        .and_then(JsonValue::as_str)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())?;

    let (latitude, longitude) = api_coordinates(value)?;

    Some(TreeRecord {
        neighbourhood,
        common_name: non_empty_or_unknown(
            obj.get("common_name")
                .and_then(JsonValue::as_str)
                .unwrap_or("")
                .trim(),
        ),
        species_name: non_empty_or_unknown(
            obj.get("species_name")
                .and_then(JsonValue::as_str)
                .unwrap_or("")
                .trim(),
        ),
        height: json_opt_f64(obj.get("height_range_id"))?,
        diameter: json_opt_f64(obj.get("diameter"))?,
        planting_year: json_opt_year(obj.get("date_planted"))?,
        latitude,
        longitude,
    })
}

fn api_coordinates(value: &JsonValue) -> Option<(f64, f64)> {
    if let Some(coords) = value
        .pointer("/geom/geometry/coordinates")
        .and_then(JsonValue::as_array)
    {
        if let [lon, lat] = coords.as_slice() {
            return Some((lat.as_f64()?, lon.as_f64()?));
        }
        return None;
    }
    let point = value.get("geo_point_2d")?;
    Some((
        point.get("lat").and_then(JsonValue::as_f64)?,
        point.get("lon").and_then(JsonValue::as_f64)?,
    ))
}

/// Missing or JSON null is "absent"; any other non-number is malformed.
fn json_opt_f64(value: Option<&JsonValue>) -> Option<Option<f64>> {
    match value {
        None | Some(JsonValue::Null) => Some(None),
        Some(v) => v.as_f64().map(Some),
    }
}

fn json_opt_year(value: Option<&JsonValue>) -> Option<Option<i32>> {
    match value {
        None | Some(JsonValue::Null) => Some(None),
        Some(v) => parse_opt_year(v.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HEADER: &str =
        "NEIGHBOURHOOD_NAME;COMMON_NAME;SPECIES_NAME;HEIGHT_RANGE_ID;DIAMETER;DATE_PLANTED;GEO_POINT_2D";

    fn parse(body: &str) -> LoadReport {
        parse_csv(format!("{HEADER}\n{body}").as_bytes()).expect("parse should succeed")
    }

    #[test]
    fn csv_happy_path() {
        let report = parse(
            "Kitsilano;MAPLE;Acer;2;9.5;1998-04-01;49.26, -123.16\n\
             DUNBAR-SOUTHLANDS;CHERRY;Prunus;;;;49.25, -123.18",
        );
        assert_eq!(report.dropped_rows, 0);
        assert_eq!(report.table.len(), 2);

        let first = &report.table.records[0];
        assert_eq!(first.neighbourhood, "KITSILANO"); // uppercased at load
        assert_eq!(first.height, Some(2.0));
        assert_eq!(first.planting_year, Some(1998));
        assert_eq!(first.latitude, 49.26);

        let second = &report.table.records[1];
        assert_eq!(second.height, None);
        assert_eq!(second.diameter, None);
        assert_eq!(second.planting_year, None);
    }

    #[test]
    fn missing_required_column_is_a_format_error() {
        let body = "COMMON_NAME;GEO_POINT_2D\nMAPLE;49.26, -123.16";
        let err = parse_csv(body.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Format(_)));

        let body = "NEIGHBOURHOOD_NAME;COMMON_NAME\nKITSILANO;MAPLE";
        let err = parse_csv(body.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Format(_)));
    }

    #[test]
    fn malformed_rows_are_dropped_and_counted() {
        let report = parse(
            "KITSILANO;MAPLE;Acer;2;9.5;1998-04-01;49.26, -123.16\n\
             ;CHERRY;Prunus;;;;49.25, -123.18\n\
             KITSILANO;OAK;Quercus;;;;not-a-point\n\
             KITSILANO;ELM;Ulmus;;garbage;;49.27, -123.15",
        );
        assert_eq!(report.table.len(), 1);
        assert_eq!(report.dropped_rows, 3);
    }

    #[test]
    fn loader_is_deterministic() {
        let body = "KITSILANO;MAPLE;Acer;2;9.5;1998-04-01;49.26, -123.16\n\
                    KITSILANO;OAK;Quercus;;;;bad";
        let a = parse(body);
        let b = parse(body);
        assert_eq!(a.table.len(), b.table.len());
        assert_eq!(a.dropped_rows, b.dropped_rows);
        assert_eq!(a.table.records, b.table.records);
    }

    #[test]
    fn api_record_with_geom_coordinates() {
        let rec = parse_api_record(&json!({
            "neighbourhood_name": "Kitsilano",
            "common_name": "MAPLE",
            "species_name": "Acer",
            "height_range_id": 2,
            "diameter": 9.5,
            "date_planted": "1998-04-01",
            "geom": { "geometry": { "coordinates": [-123.16, 49.26] } },
        }))
        .expect("record should parse");
        assert_eq!(rec.neighbourhood, "KITSILANO");
        assert_eq!(rec.latitude, 49.26);
        assert_eq!(rec.longitude, -123.16);
        assert_eq!(rec.planting_year, Some(1998));
    }

    #[test]
    fn api_record_falls_back_to_geo_point() {
        let rec = parse_api_record(&json!({
            "neighbourhood_name": "SUNSET",
            "common_name": "CHERRY",
            "geo_point_2d": { "lat": 49.22, "lon": -123.09 },
            "height_range_id": null,
        }))
        .expect("record should parse");
        assert_eq!(rec.latitude, 49.22);
        assert_eq!(rec.height, None);
        assert_eq!(rec.species_name, "Unknown");
    }

    #[test]
    fn api_record_without_coordinates_is_dropped() {
        assert!(parse_api_record(&json!({
            "neighbourhood_name": "SUNSET",
            "common_name": "CHERRY",
        }))
        .is_none());
    }

    #[test]
    fn response_without_results_is_a_format_error() {
        let err = page_results(&json!({ "error": "nope" })).unwrap_err();
        assert!(matches!(err, LoadError::Format(_)));
        assert_eq!(page_results(&json!({ "results": [] })).unwrap().len(), 0);
    }

    #[test]
    fn csv_and_api_rows_converge_on_the_same_schema() {
        let from_csv = parse("Kitsilano;MAPLE;Acer;2;9.5;1998-04-01;49.26, -123.16")
            .table
            .records[0]
            .clone();
        let from_api = parse_api_record(&json!({
            "neighbourhood_name": "Kitsilano",
            "common_name": "MAPLE",
            "species_name": "Acer",
            "height_range_id": 2,
            "diameter": 9.5,
            "date_planted": "1998-04-01",
            "geom": { "geometry": { "coordinates": [-123.16, 49.26] } },
        }))
        .expect("record should parse");
        assert_eq!(from_csv, from_api);
    }

    #[test]
    fn http_500_is_a_network_error() {
        use std::io::Write;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(
                b"HTTP/1.1 500 Internal Server Error\r\n\
                  Content-Length: 0\r\nConnection: close\r\n\r\n",
            );
        });

        let err = load_table(&DataSource::Api {
            endpoint: format!("http://{addr}"),
            neighbourhood: None,
        })
        .unwrap_err();
        assert!(matches!(err, LoadError::Network(_)));
        server.join().expect("server thread");
    }

    #[test]
    fn where_clause_targets_the_neighbourhood_field() {
        assert_eq!(
            where_clause("WEST POINT GREY"),
            "neighbourhood_name='WEST POINT GREY'"
        );
    }
}
