//! SQLite-backed persistent backend with an R*Tree spatial index.

use crate::config::SqliteConfig;
use crate::geo::{distance, DistanceUnit, Location, EARTH_RADIUS_KM};
use crate::model::{Cab, CabId, ProximityQuery, QueryDefaults};
use crate::service::{CabService, ServiceError};
use rusqlite::{params, Connection};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Meters spanned by one degree of latitude on the mean-radius sphere.
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_KM * 1000.0 * std::f64::consts::PI / 180.0;

/// Persistent cab store backed by SQLite.
///
/// Canonical coordinates live as f64 REAL columns in the records table, in
/// `[longitude, latitude]` column order per spatial-index convention (the
/// reverse of [`Location`]'s field order; [`to_row`]/[`from_row`] are the
/// only places the swap happens). A companion R*Tree virtual table indexes
/// the same points for proximity queries.
///
/// The R*Tree stores its boxes as f32 rounded outward, so an index hit is
/// only a candidate; every query re-checks candidates with the exact
/// haversine distance against the canonical columns. That also keeps the
/// upsert/read round-trip bit-exact.
///
/// The single connection handle is not safe for concurrent use, so it lives
/// behind a mutex; SQLite handles durability and file locking itself.
/// [`close`](CabService::close) takes the connection out, after which every
/// operation fails fast with [`ServiceError::Backend`].
#[derive(Debug)]
pub struct SqliteCabService {
    conn: Mutex<Option<Connection>>,
    table: String,
    defaults: QueryDefaults,
}

impl SqliteCabService {
    /// Open (creating if needed) the database at `config.path` and ensure
    /// the records table and its R*Tree index exist.
    ///
    /// Returns a ready-to-use backend or a fatal error; no partial
    /// initialization state is exposed.
    pub fn open(config: SqliteConfig) -> Result<Self, ServiceError> {
        validate_table_name(&config.table)?;

        let conn = Connection::open(&config.path).map_err(ServiceError::backend)?;
        // journal_mode returns the resulting mode as a row.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .map_err(ServiceError::backend)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(ServiceError::backend)?;

        create_schema(&conn, &config.table).map_err(ServiceError::backend)?;

        info!(path = %config.path.display(), table = %config.table, "sqlite backend ready");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            table: config.table,
            defaults: QueryDefaults::default(),
        })
    }

    /// Run `f` against the live connection, or fail fast if the backend
    /// has been closed.
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut guard = self.conn.lock().unwrap();
        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(ServiceError::backend("backend is closed")),
        }
    }

    /// Proximity query without the spatial index: scan the whole records
    /// table and filter by exact haversine distance.
    ///
    /// Kept for verifying the indexed path against; applies the same
    /// sanitization and the same stop-at-limit boundary, so both paths
    /// agree on any dataset.
    pub fn query_unindexed(&self, query: ProximityQuery) -> Result<Vec<Cab>, ServiceError> {
        let q = query.sanitize(&self.defaults);
        self.with_conn(|conn| {
            let sql = format!("SELECT id, longitude, latitude FROM {}", self.table);
            let mut stmt = conn.prepare(&sql).map_err(ServiceError::backend)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(from_row(row.get(0)?, row.get(1)?, row.get(2)?))
                })
                .map_err(ServiceError::backend)?;

            let mut results = Vec::new();
            for cab in rows {
                let cab = cab.map_err(ServiceError::backend)?;
                if distance(q.center, cab.location, q.unit) <= q.radius {
                    results.push(cab);
                    if results.len() == q.limit {
                        break;
                    }
                }
            }
            Ok(results)
        })
    }
}

impl CabService for SqliteCabService {
    fn read(&self, id: CabId) -> Result<Cab, ServiceError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, longitude, latitude FROM {} WHERE id = ?1",
                self.table
            );
            match conn.query_row(&sql, params![id.0 as i64], |row| {
                Ok(from_row(row.get(0)?, row.get(1)?, row.get(2)?))
            }) {
                Ok(cab) => Ok(cab),
                Err(rusqlite::Error::QueryReturnedNoRows) => Err(ServiceError::NotFound(id)),
                Err(err) => Err(ServiceError::backend(err)),
            }
        })
    }

    fn upsert(&self, cab: Cab) -> Result<(), ServiceError> {
        let (id, longitude, latitude) = to_row(&cab);
        self.with_conn(|conn| {
            // Records table and index row move in one transaction so the
            // index never points at a stale position.
            let tx = conn.transaction().map_err(ServiceError::backend)?;
            tx.execute(
                &format!(
                    "INSERT INTO {t} (id, longitude, latitude) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(id) DO UPDATE SET \
                     longitude = excluded.longitude, latitude = excluded.latitude",
                    t = self.table
                ),
                params![id, longitude, latitude],
            )
            .map_err(ServiceError::backend)?;
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO {t}_rtree \
                     (id, min_lon, max_lon, min_lat, max_lat) \
                     VALUES (?1, ?2, ?2, ?3, ?3)",
                    t = self.table
                ),
                params![id, longitude, latitude],
            )
            .map_err(ServiceError::backend)?;
            tx.commit().map_err(ServiceError::backend)
        })
    }

    fn delete(&self, id: CabId) -> Result<(), ServiceError> {
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(ServiceError::backend)?;
            tx.execute(
                &format!("DELETE FROM {} WHERE id = ?1", self.table),
                params![id.0 as i64],
            )
            .map_err(ServiceError::backend)?;
            tx.execute(
                &format!("DELETE FROM {}_rtree WHERE id = ?1", self.table),
                params![id.0 as i64],
            )
            .map_err(ServiceError::backend)?;
            tx.commit().map_err(ServiceError::backend)
        })
    }

    fn delete_all(&self) -> Result<(), ServiceError> {
        self.with_conn(|conn| {
            // Dropping the R*Tree is faster than row-by-row deletion; the
            // index must be re-created before returning, and a failed
            // re-creation propagates rather than leaving the store
            // un-indexed.
            let tx = conn.transaction().map_err(ServiceError::backend)?;
            tx.execute(&format!("DELETE FROM {}", self.table), [])
                .map_err(ServiceError::backend)?;
            tx.execute_batch(&format!(
                "DROP TABLE IF EXISTS {t}_rtree; {create}",
                t = self.table,
                create = rtree_ddl(&self.table),
            ))
            .map_err(ServiceError::backend)?;
            tx.commit().map_err(ServiceError::backend)
        })
    }

    fn query(&self, query: ProximityQuery) -> Result<Vec<Cab>, ServiceError> {
        let q = query.sanitize(&self.defaults);
        let radius_meters = radius_in_meters(q.radius, q.unit);
        let bbox = bounding_box(q.center, radius_meters);

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT r.id, r.longitude, r.latitude \
                 FROM {t} r JOIN {t}_rtree x ON r.id = x.id \
                 WHERE x.max_lon >= ?1 AND x.min_lon <= ?2 \
                   AND x.max_lat >= ?3 AND x.min_lat <= ?4",
                t = self.table
            );
            let mut stmt = conn.prepare(&sql).map_err(ServiceError::backend)?;

            // The bounding box over-approximates the circle, so candidates
            // still go through the exact distance check. A circle crossing
            // the antimeridian needs two disjoint longitude scans.
            let mut results = Vec::new();
            let mut candidates = 0usize;
            'spans: for (min_lon, max_lon) in &bbox.lon_spans {
                let rows = stmt
                    .query_map(
                        params![min_lon, max_lon, bbox.min_lat, bbox.max_lat],
                        |row| Ok(from_row(row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .map_err(ServiceError::backend)?;

                for cab in rows {
                    let cab = cab.map_err(ServiceError::backend)?;
                    candidates += 1;
                    if distance(q.center, cab.location, q.unit) <= q.radius {
                        results.push(cab);
                        if results.len() == q.limit {
                            break 'spans;
                        }
                    }
                }
            }
            debug!(
                candidates,
                matched = results.len(),
                radius_meters,
                "indexed query complete"
            );
            Ok(results)
        })
    }

    fn close(&self) {
        let mut guard = self.conn.lock().unwrap();
        if let Some(conn) = guard.take() {
            if let Err((_, err)) = conn.close() {
                warn!(error = %err, "failed to close sqlite connection");
            }
        }
    }
}

/// Create the records table and its R*Tree index if they do not exist.
fn create_schema(conn: &Connection, table: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {t} (
            id        INTEGER PRIMARY KEY,
            longitude REAL NOT NULL,
            latitude  REAL NOT NULL
        );
        {rtree}",
        t = table,
        rtree = rtree_ddl(table),
    ))
}

fn rtree_ddl(table: &str) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {t}_rtree USING rtree(
            id, min_lon, max_lon, min_lat, max_lat
        );",
        t = table
    )
}

/// Table names are spliced into SQL, so only identifier characters pass.
fn validate_table_name(table: &str) -> Result<(), ServiceError> {
    let mut chars = table.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::BadParameter(format!(
            "invalid table name \"{table}\""
        )))
    }
}

/// Convert a cab into its storage row: `(id, longitude, latitude)`.
///
/// Column order follows the spatial-index convention of longitude first,
/// the reverse of the core's (latitude, longitude). This function and
/// [`from_row`] are the only places the axis order swaps.
fn to_row(cab: &Cab) -> (i64, f64, f64) {
    (cab.id.0 as i64, cab.location.longitude, cab.location.latitude)
}

/// Rebuild a cab from its storage row, undoing the axis order swap.
fn from_row(id: i64, longitude: f64, latitude: f64) -> Cab {
    Cab {
        id: CabId(id as u64),
        location: Location {
            latitude,
            longitude,
        },
    }
}

/// Radius converted to meters, the index's native unit.
fn radius_in_meters(radius: f64, unit: DistanceUnit) -> f64 {
    match unit {
        DistanceUnit::Meters => radius,
        DistanceUnit::Kilometers => radius * 1000.0,
        DistanceUnit::Miles => radius * 1609.34,
        DistanceUnit::Feet => radius * 0.3048,
    }
}

/// Degree-space region containing every point within a radius of a center.
///
/// One latitude span plus one or two longitude spans. Longitude is
/// periodic, so a circle crossing the ±180° meridian cannot be covered by
/// a single `[min_lon, max_lon]` interval over stored coordinates; it
/// splits into a span ending at 180 and a span starting at -180.
#[derive(Debug, Clone, PartialEq)]
struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    lon_spans: Vec<(f64, f64)>,
}

/// Bounding region for the circle of `radius_meters` around `center`.
///
/// The longitude width is taken at the latitude closest to the pole
/// inside the box, where meridians converge, so the region always
/// contains the full circle.
fn bounding_box(center: Location, radius_meters: f64) -> BoundingBox {
    let lat_delta = radius_meters / METERS_PER_DEGREE;
    let min_lat = center.latitude - lat_delta;
    let max_lat = center.latitude + lat_delta;

    let widest_lat = min_lat.abs().max(max_lat.abs()).min(89.9);
    let lon_delta = lat_delta / widest_lat.to_radians().cos();

    let min_lon = center.longitude - lon_delta;
    let max_lon = center.longitude + lon_delta;

    // The two wrapped spans are disjoint because lon_delta < 180 keeps
    // the circle narrower than a full revolution.
    let lon_spans = if lon_delta >= 180.0 {
        vec![(-180.0, 180.0)]
    } else if min_lon < -180.0 {
        vec![(-180.0, max_lon), (min_lon + 360.0, 180.0)]
    } else if max_lon > 180.0 {
        vec![(min_lon, 180.0), (-180.0, max_lon - 360.0)]
    } else {
        vec![(min_lon, max_lon)]
    };

    BoundingBox {
        min_lat,
        max_lat,
        lon_spans,
    }
}
