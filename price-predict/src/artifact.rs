//! Binary artifact codec for the pre-fitted transformer and model.
//!
//! Every artifact starts with a 16 byte header (`magic`, `version`, `kind`,
//! reserved) followed by a kind specific payload. All integers and floats are
//! little-endian.

use bytemuck::{Pod, Zeroable};
use memmap2::{Mmap, MmapOptions};
use price_model::{FeatureTransform, LinearRegression, ModelError, PolynomialFeatures};
use std::fs::File;
use std::io::{self, Write};
use std::mem::size_of;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const MAGIC: [u8; 4] = *b"PRCA";
pub const FORMAT_VERSION: u32 = 1;

/// Errors raised while reading or writing artifact files.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to access artifact {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid artifact {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error("malformed artifact: {0}")]
    Malformed(String),

    #[error("artifact parameters rejected: {0}")]
    Model(#[from] ModelError),
}

impl ArtifactError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    /// Attach the file a decode error came from.
    fn at(self, path: &Path) -> Self {
        if matches!(self, Self::Malformed(_) | Self::Model(_)) {
            return Self::Format { path: path.to_path_buf(), reason: self.to_string() };
        }
        self
    }
}

/// Discriminates the payload stored after the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ArtifactKind {
    PolynomialTransformer = 1,
    LinearModel = 2,
}

impl ArtifactKind {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::PolynomialTransformer),
            2 => Some(Self::LinearModel),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Header {
    magic: [u8; 4],
    version: u32,
    kind: u32,
    reserved: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PolyRecord {
    n_features_in: u32,
    degree: u32,
    include_bias: u8,
    interaction_only: u8,
    _pad: [u8; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LinearRecord {
    n_coefficients: u32,
    reserved: u32,
    intercept: u64, // f64 bits
}

/// A pre-fitted object that can be stored as an artifact file.
pub trait Artifact: Sized {
    const KIND: ArtifactKind;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), ArtifactError>;

    fn decode_payload(payload: &[u8]) -> Result<Self, ArtifactError>;
}

impl Artifact for PolynomialFeatures {
    const KIND: ArtifactKind = ArtifactKind::PolynomialTransformer;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), ArtifactError> {
        let record = PolyRecord {
            n_features_in: to_u32("n_features_in", self.n_features_in())?.to_le(),
            degree: to_u32("degree", self.degree())?.to_le(),
            include_bias: u8::from(self.include_bias()),
            interaction_only: u8::from(self.interaction_only()),
            _pad: [0; 2],
        };
        out.extend_from_slice(bytemuck::bytes_of(&record));
        Ok(())
    }

    fn decode_payload(payload: &[u8]) -> Result<Self, ArtifactError> {
        let mut cursor = payload;
        let record: PolyRecord = read_pod(&mut cursor, "transformer record")?;
        expect_end(cursor)?;
        let flag = |name: &str, v: u8| match v {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ArtifactError::Malformed(format!("{name} flag is {other}"))),
        };
        Ok(PolynomialFeatures::new(
            u32::from_le(record.n_features_in) as usize,
            u32::from_le(record.degree) as usize,
            flag("include_bias", record.include_bias)?,
            flag("interaction_only", record.interaction_only)?,
        )?)
    }
}

impl Artifact for LinearRegression {
    const KIND: ArtifactKind = ArtifactKind::LinearModel;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), ArtifactError> {
        let record = LinearRecord {
            n_coefficients: to_u32("coefficients", self.coefficients().len())?.to_le(),
            reserved: 0,
            intercept: self.intercept().to_bits().to_le(),
        };
        out.extend_from_slice(bytemuck::bytes_of(&record));
        for c in self.coefficients().iter() {
            out.extend_from_slice(&c.to_le_bytes());
        }
        Ok(())
    }

    fn decode_payload(payload: &[u8]) -> Result<Self, ArtifactError> {
        let mut cursor = payload;
        let record: LinearRecord = read_pod(&mut cursor, "model record")?;
        let n = u32::from_le(record.n_coefficients) as usize;
        let expected = n
            .checked_mul(size_of::<f64>())
            .ok_or_else(|| ArtifactError::Malformed(format!("{n} coefficients")))?;
        if cursor.len() != expected {
            return Err(ArtifactError::Malformed(format!(
                "expected {expected} coefficient bytes, found {}",
                cursor.len()
            )));
        }
        let coefficients = cursor
            .chunks_exact(size_of::<f64>())
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();
        let intercept = f64::from_bits(u64::from_le(record.intercept));
        Ok(LinearRegression::new(coefficients, intercept)?)
    }
}

fn to_u32(name: &str, v: usize) -> Result<u32, ArtifactError> {
    u32::try_from(v).map_err(|_| ArtifactError::Malformed(format!("{name} = {v} does not fit in u32")))
}

fn read_pod<T: Pod>(cursor: &mut &[u8], what: &str) -> Result<T, ArtifactError> {
    let n = size_of::<T>();
    if cursor.len() < n {
        return Err(ArtifactError::Malformed(format!(
            "truncated {what}: need {n} bytes, found {}",
            cursor.len()
        )));
    }
    let (head, rest) = cursor.split_at(n);
    *cursor = rest;
    Ok(bytemuck::pod_read_unaligned(head))
}

fn expect_end(cursor: &[u8]) -> Result<(), ArtifactError> {
    if cursor.is_empty() {
        Ok(())
    } else {
        Err(ArtifactError::Malformed(format!("{} trailing bytes", cursor.len())))
    }
}

/// Serialize an artifact into its on-disk representation.
pub fn encode<A: Artifact>(artifact: &A) -> Result<Vec<u8>, ArtifactError> {
    let header = Header {
        magic: MAGIC,
        version: FORMAT_VERSION.to_le(),
        kind: (A::KIND as u32).to_le(),
        reserved: 0,
    };
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(bytemuck::bytes_of(&header));
    artifact.encode_payload(&mut out)?;
    Ok(out)
}

/// Parse an artifact from bytes, checking the header against `A`.
pub fn decode<A: Artifact>(bytes: &[u8]) -> Result<A, ArtifactError> {
    let mut cursor = bytes;
    let header: Header = read_pod(&mut cursor, "header")?;
    if header.magic != MAGIC {
        return Err(ArtifactError::Malformed(format!("bad magic {:?}", header.magic)));
    }
    let version = u32::from_le(header.version);
    if version != FORMAT_VERSION {
        return Err(ArtifactError::Malformed(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    let kind = u32::from_le(header.kind);
    match ArtifactKind::from_u32(kind) {
        Some(k) if k == A::KIND => {}
        Some(k) => {
            return Err(ArtifactError::Malformed(format!(
                "expected {:?} artifact, found {k:?}",
                A::KIND
            )))
        }
        None => return Err(ArtifactError::Malformed(format!("unknown artifact kind {kind}"))),
    }
    A::decode_payload(cursor)
}

pub fn save<A: Artifact>(artifact: &A, path: &Path) -> Result<(), ArtifactError> {
    let bytes = encode(artifact)?;
    let mut f = File::create(path).map_err(|e| ArtifactError::io(path, e))?;
    f.write_all(&bytes).map_err(|e| ArtifactError::io(path, e))?;
    f.sync_all().map_err(|e| ArtifactError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), kind = ?A::KIND, "saved artifact");
    Ok(())
}

pub fn load<A: Artifact>(path: &Path) -> Result<A, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|e| ArtifactError::io(path, e))?;
    decode(&bytes).map_err(|e| e.at(path))
}

pub fn load_mmap<A: Artifact>(path: &Path) -> Result<A, ArtifactError> {
    let file = File::open(path).map_err(|e| ArtifactError::io(path, e))?;
    let mmap = map(&file).map_err(|e| ArtifactError::io(path, e))?;
    decode(&mmap[..]).map_err(|e| e.at(path))
}

fn map(file: &File) -> io::Result<Mmap> {
    // SAFETY: the map is read-only and dropped before returning; artifacts
    // are not expected to be rewritten while a prediction is running.
    unsafe { MmapOptions::new().map(file) }
}

/// Load through a memory map, falling back to a plain read when mapping fails.
///
/// Errors opening the file are reported as-is; only the map step falls back.
pub fn open<A: Artifact>(path: &Path) -> Result<A, ArtifactError> {
    let file = File::open(path).map_err(|e| ArtifactError::io(path, e))?;
    match map(&file) {
        Ok(mmap) => decode(&mmap[..]).map_err(|e| e.at(path)),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "mmap failed, reading file");
            load(path)
        }
    }
}
