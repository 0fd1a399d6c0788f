//! Persistence of rule matrices.
//!
//! A store is saved to a main file at the given path and, when an instance
//! map exists, a companion file next to it (see [`companion_path`]). Both
//! use the same [`MatrixFormat`].
//!
//! ## Text format
//!
//! Semicolon-delimited lines. A label line precedes each header entry:
//!
//! ```text
//! n_features;n_classes;predicate_type
//! 2;2;range
//! feature_names
//! f0;f1
//! feature_values_min / feature_values_max / features_used /
//! feature_importances / class_names / class_instances_count   (same shape)
//! <one name per column>
//! <one dense row per rule>
//! ```
//!
//! The column-name line is documentation only; offsets are re-derived from
//! the first three scalars. The instance map companion holds a
//! `n_rows;n_cols` line followed by dense rows.
//!
//! ## Compressed format
//!
//! A 32-byte fixed header followed by a bincode-encoded payload holding the
//! header fields and the matrix as sparse `(row, col, value)` triplets.
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RMTX"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Payload kind (u32, little-endian): 1 = rules, 2 = instance map
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{MatrixError, PredicateType, RuleId, RuleMatrix, RuleMatrixBuilder, SparseMatrix};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"RMTX";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

const KIND_RULES: u32 = 1;
const KIND_INSTANCE_MAP: u32 = 2;

const DELIMITER: char = ';';
const SCALARS_LABEL: &str = "n_features;n_classes;predicate_type";
const COMPANION_SUFFIX: &str = ".imap";

/// On-disk encoding of a saved store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixFormat {
    /// Human-readable, semicolon-delimited dense rows.
    Text,
    /// Checksummed binary container with sparse triplets.
    #[default]
    Compressed,
}

/// Path of the instance map companion of a store saved at `path`:
/// the same file name with `.imap` appended.
#[must_use]
pub fn companion_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(COMPANION_SUFFIX);
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when saving a [`RuleMatrix`].
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode rule matrix: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("name '{0}' contains a delimiter or line break")]
    InvalidName(String),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when loading a [`RuleMatrix`].
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a rule matrix binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("unexpected payload kind {found}, expected {expected}")]
    UnexpectedPayload { expected: u32, found: u32 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("corrupt file: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

fn corrupt(msg: impl Into<String>) -> DeserializeError {
    DeserializeError::Corrupt(msg.into())
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SerializedHeader {
    n_features: usize,
    n_classes: usize,
    predicate_type: String,
    feature_names: Vec<String>,
    feature_values_min: Vec<f64>,
    feature_values_max: Vec<f64>,
    features_used: Vec<usize>,
    feature_importances: Vec<f64>,
    class_names: Vec<String>,
    class_instances_count: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedSparse {
    n_rows: usize,
    n_cols: usize,
    triplets: Vec<(usize, usize, f64)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRuleMatrix {
    header: SerializedHeader,
    column_names: Vec<String>,
    rules: SerializedSparse,
}

impl SerializedSparse {
    fn from_matrix(matrix: &SparseMatrix) -> Self {
        Self {
            n_rows: matrix.n_rows(),
            n_cols: matrix.n_cols(),
            triplets: matrix.triplets().collect(),
        }
    }

    fn into_matrix(self) -> Result<SparseMatrix, DeserializeError> {
        if let Some(&(r, c, _)) = self
            .triplets
            .iter()
            .find(|&&(r, c, _)| r >= self.n_rows || c >= self.n_cols)
        {
            return Err(corrupt(format!(
                "entry ({r}, {c}) outside a {}x{} matrix",
                self.n_rows, self.n_cols
            )));
        }
        Ok(SparseMatrix::from_triplets(self.n_rows, self.n_cols, self.triplets))
    }
}

// ---------------------------------------------------------------------------
// RuleMatrix <-> serialized parts
// ---------------------------------------------------------------------------

/// The rows to persist, the header describing them, and the matching slice
/// of the instance map.
struct Snapshot {
    header: SerializedHeader,
    rows: Vec<RuleId>,
    instances_map: Option<SparseMatrix>,
}

fn snapshot(store: &RuleMatrix, rules: Option<&[RuleId]>) -> Result<Snapshot, SerializeError> {
    let (rows, features_used) = match rules {
        Some(rules) => (rules.to_vec(), store.get_features_used(rules)?),
        None => ((0..store.n_rules()).collect(), store.features_used().to_vec()),
    };
    let instances_map = store.instances_map.as_ref().map(|m| match rules {
        Some(rules) => m.select_rows(rules),
        None => m.clone(),
    });

    Ok(Snapshot {
        header: SerializedHeader {
            n_features: store.n_features(),
            n_classes: store.n_classes(),
            predicate_type: store.predicate_type().to_string(),
            feature_names: store.feature_names.clone(),
            feature_values_min: store.feature_values_min.clone(),
            feature_values_max: store.feature_values_max.clone(),
            features_used,
            feature_importances: store.feature_importances.clone(),
            class_names: store.class_names.clone(),
            class_instances_count: store.class_instances_count.clone(),
        },
        rows,
        instances_map,
    })
}

/// Rebuild an empty store from a header, deriving the layout exactly as
/// [`RuleMatrix::new`] would.
fn store_from_header(header: SerializedHeader) -> Result<RuleMatrix, DeserializeError> {
    let predicate_type = PredicateType::from_str(&header.predicate_type)?;
    let mut store = RuleMatrixBuilder::new(header.n_features, header.n_classes)
        .predicate_type(predicate_type)
        .feature_names(header.feature_names)
        .feature_range(header.feature_values_min, header.feature_values_max)
        .feature_importances(header.feature_importances)
        .class_names(header.class_names)
        .class_instances_count(header.class_instances_count)
        .build()
        .map_err(|err| corrupt(format!("invalid header: {err}")))?;
    store.features_used = OnceLock::from(header.features_used);
    Ok(store)
}

/// Install dense rows into a freshly built store, keeping the persisted
/// `features_used`.
fn install_rows(store: &mut RuleMatrix, rows: &[Vec<f64>]) -> Result<(), DeserializeError> {
    let width = store.layout().width();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(corrupt(format!(
            "rule {i} has {} columns, layout requires {width}",
            row.len()
        )));
    }
    let features_used = std::mem::take(&mut store.features_used);
    store.set_rules(rows)?;
    store.features_used = features_used;
    Ok(())
}

fn attach_instances_map(
    store: &mut RuleMatrix,
    map: SparseMatrix,
) -> Result<(), DeserializeError> {
    if map.n_rows() != store.n_rules() {
        return Err(corrupt(format!(
            "instance map has {} rows for {} rules",
            map.n_rows(),
            store.n_rules()
        )));
    }
    store.instances_map = Some(map);
    Ok(())
}

// ---------------------------------------------------------------------------
// Text encoding
// ---------------------------------------------------------------------------

/// Names are written verbatim, so they must not contain the field delimiter
/// or a line break.
fn check_text_names(store: &RuleMatrix) -> Result<(), SerializeError> {
    for name in store.feature_names.iter().chain(&store.class_names) {
        if name.contains([DELIMITER, '\n', '\r']) {
            return Err(SerializeError::InvalidName(name.clone()));
        }
    }
    Ok(())
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn encode_text(store: &RuleMatrix, snap: &Snapshot) -> String {
    let h = &snap.header;
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "{SCALARS_LABEL}");
    let _ = writeln!(out, "{};{};{}", h.n_features, h.n_classes, h.predicate_type);
    let _ = writeln!(out, "feature_names\n{}", join(&h.feature_names));
    let _ = writeln!(out, "feature_values_min\n{}", join(&h.feature_values_min));
    let _ = writeln!(out, "feature_values_max\n{}", join(&h.feature_values_max));
    let _ = writeln!(out, "features_used\n{}", join(&h.features_used));
    let _ = writeln!(out, "feature_importances\n{}", join(&h.feature_importances));
    let _ = writeln!(out, "class_names\n{}", join(&h.class_names));
    let _ = writeln!(out, "class_instances_count\n{}", join(&h.class_instances_count));
    let _ = writeln!(out, "{}", join(&store.column_names()));
    for &rule in &snap.rows {
        let _ = writeln!(out, "{}", join(&store.row(rule)));
    }
    out
}

fn encode_text_map(map: &SparseMatrix) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{};{}", map.n_rows(), map.n_cols());
    for r in 0..map.n_rows() {
        let _ = writeln!(out, "{}", join(&map.row_dense(r)));
    }
    out
}

/// Line reader that turns every shortfall into [`DeserializeError::Corrupt`].
struct TextLines<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> TextLines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
        }
    }

    fn next(&mut self, what: &str) -> Result<(usize, &'a str), DeserializeError> {
        self.lines
            .next()
            .map(|(i, line)| (i + 1, line))
            .ok_or_else(|| corrupt(format!("missing {what}")))
    }

    fn label(&mut self, label: &str) -> Result<(), DeserializeError> {
        let (n, line) = self.next(label)?;
        if line.trim_end() != label {
            return Err(corrupt(format!("line {n}: expected '{label}', found '{line}'")));
        }
        Ok(())
    }

    fn labelled<T: FromStr>(&mut self, label: &str) -> Result<Vec<T>, DeserializeError> {
        self.label(label)?;
        let (n, line) = self.next(label)?;
        parse_values(line, n, label)
    }

    /// Names are read untrimmed. An empty line is a single empty name when
    /// exactly one is expected.
    fn names(&mut self, label: &str, expected: usize) -> Result<Vec<String>, DeserializeError> {
        self.label(label)?;
        let (_, line) = self.next(label)?;
        if line.is_empty() && expected != 1 {
            return Ok(Vec::new());
        }
        Ok(line.split(DELIMITER).map(str::to_owned).collect())
    }
}

fn parse_values<T: FromStr>(line: &str, n: usize, what: &str) -> Result<Vec<T>, DeserializeError> {
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return Ok(Vec::new());
    }
    line.split(DELIMITER)
        .map(|field| {
            field
                .trim()
                .parse::<T>()
                .map_err(|_| corrupt(format!("line {n}: bad {what} value '{field}'")))
        })
        .collect()
}

fn decode_text(text: &str) -> Result<RuleMatrix, DeserializeError> {
    let mut lines = TextLines::new(text);
    lines.label(SCALARS_LABEL)?;
    let (n, scalars) = lines.next("dimensions")?;
    let fields: Vec<&str> = scalars.trim_end().split(DELIMITER).collect();
    let [n_features, n_classes, predicate_type] = fields[..] else {
        return Err(corrupt(format!("line {n}: expected 3 header scalars")));
    };
    let parse_dim = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| corrupt(format!("line {n}: bad dimension '{s}'")))
    };

    let (n_features, n_classes) = (parse_dim(n_features)?, parse_dim(n_classes)?);

    let header = SerializedHeader {
        n_features,
        n_classes,
        predicate_type: predicate_type.trim().to_owned(),
        feature_names: lines.names("feature_names", n_features)?,
        feature_values_min: lines.labelled("feature_values_min")?,
        feature_values_max: lines.labelled("feature_values_max")?,
        features_used: lines.labelled("features_used")?,
        feature_importances: lines.labelled("feature_importances")?,
        class_names: lines.names("class_names", n_classes)?,
        class_instances_count: lines.labelled("class_instances_count")?,
    };
    let mut store = store_from_header(header)?;

    // column names: documentation only
    lines.next("column name row")?;

    let mut rows = Vec::new();
    while let Some((i, line)) = lines.lines.next() {
        if line.trim().is_empty() {
            continue;
        }
        rows.push(parse_values::<f64>(line, i + 1, "rule")?);
    }
    install_rows(&mut store, &rows)?;
    Ok(store)
}

fn decode_text_map(text: &str) -> Result<SparseMatrix, DeserializeError> {
    let mut lines = TextLines::new(text);
    let (n, shape) = lines.next("instance map shape")?;
    let dims: Vec<usize> = parse_values(shape, n, "shape")?;
    let [n_rows, n_cols] = dims[..] else {
        return Err(corrupt(format!("line {n}: expected 'n_rows;n_cols'")));
    };

    let mut triplets = Vec::new();
    for r in 0..n_rows {
        let (n, line) = lines.next("instance map row")?;
        let row: Vec<f64> = parse_values(line, n, "instance map")?;
        if row.len() != n_cols {
            return Err(corrupt(format!(
                "line {n}: {} columns, expected {n_cols}",
                row.len()
            )));
        }
        triplets.extend(
            row.into_iter()
                .enumerate()
                .filter(|&(_, v)| v != 0.0)
                .map(|(c, v)| (r, c, v)),
        );
    }
    Ok(SparseMatrix::from_triplets(n_rows, n_cols, triplets))
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, kind: u32, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&kind.to_le_bytes());
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

/// Parsed fixed header: format version, payload kind, payload length, hash.
#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version (informational, not used for checks)
    let kind = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, kind, payload_len, hash))
}

fn seal<T: Serialize>(kind: u32, value: &T) -> Result<Vec<u8>, SerializeError> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard())?;
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, kind, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

fn unseal<T: for<'de> Deserialize<'de>>(
    expected_kind: u32,
    bytes: &[u8],
) -> Result<T, DeserializeError> {
    let (format_version, kind, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }
    if kind != expected_kind {
        return Err(DeserializeError::UnexpectedPayload {
            expected: expected_kind,
            found: kind,
        });
    }

    let payload_end = HEADER_SIZE + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[HEADER_SIZE..payload_end];

    // Integrity check
    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (value, _): (T, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    Ok(value)
}

fn encode_binary(store: &RuleMatrix, snap: Snapshot) -> Result<Vec<u8>, SerializeError> {
    let mut rows = SparseMatrix::new(store.layout().width());
    for &rule in &snap.rows {
        rows.push_dense_row(&store.row(rule));
    }
    seal(
        KIND_RULES,
        &SerializedRuleMatrix {
            header: snap.header,
            column_names: store.column_names(),
            rules: SerializedSparse::from_matrix(&rows),
        },
    )
}

fn decode_binary(bytes: &[u8]) -> Result<RuleMatrix, DeserializeError> {
    let ser: SerializedRuleMatrix = unseal(KIND_RULES, bytes)?;
    let mut store = store_from_header(ser.header)?;

    let width = store.layout().width();
    if ser.rules.n_cols != width {
        return Err(corrupt(format!(
            "rule matrix has {} columns, layout requires {width}",
            ser.rules.n_cols
        )));
    }
    let matrix = ser.rules.into_matrix()?;
    let rows: Vec<Vec<f64>> = (0..matrix.n_rows()).map(|r| matrix.row_dense(r)).collect();
    install_rows(&mut store, &rows)?;
    Ok(store)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl RuleMatrix {
    /// Encode the store (or the selected rules) as a compressed binary blob.
    /// The instance map is not included.
    ///
    /// # Errors
    ///
    /// [`SerializeError`] on an unknown rule, an invalid name, or encoding failure.
    pub fn to_bytes(&self, rules: Option<&[RuleId]>) -> Result<Vec<u8>, SerializeError> {
        encode_binary(self, snapshot(self, rules)?)
    }

    /// Decode a blob produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// [`DeserializeError`] on format, integrity, or shape failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        decode_binary(bytes)
    }

    /// Render the store (or the selected rules) in the text format.
    ///
    /// # Errors
    ///
    /// [`SerializeError`] on an unknown rule or an invalid name.
    pub fn to_text(&self, rules: Option<&[RuleId]>) -> Result<String, SerializeError> {
        check_text_names(self)?;
        Ok(encode_text(self, &snapshot(self, rules)?))
    }

    /// Parse a store from the text format.
    ///
    /// # Errors
    ///
    /// [`DeserializeError::Corrupt`] if a header entry is missing or a row
    /// does not match the layout derived from the header.
    pub fn from_text(text: &str) -> Result<Self, DeserializeError> {
        decode_text(text)
    }

    /// Save the store (or only `rules`, in that order) to `path`, plus the
    /// instance map to [`companion_path`] if one exists.
    ///
    /// # Errors
    ///
    /// [`SerializeError`] on an unknown rule, an invalid name, encoding or
    /// I/O failure.
    pub fn save(
        &self,
        path: impl AsRef<Path>,
        rules: Option<&[RuleId]>,
        format: MatrixFormat,
    ) -> Result<(), SerializeError> {
        let path = path.as_ref();
        if format == MatrixFormat::Text {
            check_text_names(self)?;
        }
        let snap = snapshot(self, rules)?;
        let instances_map = snap.instances_map.clone();
        debug!(path = %path.display(), rules = snap.rows.len(), ?format, "saving rule matrix");

        match format {
            MatrixFormat::Text => std::fs::write(path, encode_text(self, &snap))?,
            MatrixFormat::Compressed => std::fs::write(path, encode_binary(self, snap)?)?,
        }

        let companion = companion_path(path);
        let Some(map) = instances_map else {
            // a companion left by an earlier save would be attached on load
            return match std::fs::remove_file(&companion) {
                Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            };
        };
        debug!(path = %companion.display(), nnz = map.nnz(), "saving instance map");
        match format {
            MatrixFormat::Text => std::fs::write(&companion, encode_text_map(&map))?,
            MatrixFormat::Compressed => std::fs::write(
                &companion,
                seal(KIND_INSTANCE_MAP, &SerializedSparse::from_matrix(&map))?,
            )?,
        }
        Ok(())
    }

    /// Load a store saved with [`save`](Self::save). The instance map is
    /// restored when its companion file exists.
    ///
    /// # Errors
    ///
    /// [`DeserializeError`] on I/O, format, integrity, or shape failure.
    pub fn load(path: impl AsRef<Path>, format: MatrixFormat) -> Result<Self, DeserializeError> {
        let path = path.as_ref();
        debug!(path = %path.display(), ?format, "loading rule matrix");
        let mut store = match format {
            MatrixFormat::Text => decode_text(&std::fs::read_to_string(path)?)?,
            MatrixFormat::Compressed => decode_binary(&std::fs::read(path)?)?,
        };

        let companion = companion_path(path);
        if companion.exists() {
            let map = match format {
                MatrixFormat::Text => decode_text_map(&std::fs::read_to_string(&companion)?)?,
                MatrixFormat::Compressed => {
                    unseal::<SerializedSparse>(KIND_INSTANCE_MAP, &std::fs::read(&companion)?)?
                        .into_matrix()?
                }
            };
            attach_instances_map(&mut store, map)?;
        }
        debug!(rules = store.n_rules(), "rule matrix loaded");
        Ok(store)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
