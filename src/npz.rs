//! Voice archive reader — NumPy `.npz` (a ZIP of `.npy` members).
//!
//! Only what voice archives use is supported: NPY format 1.x–3.x,
//! C-order arrays, `float32` or `float64` in either byte order.  Values are
//! always returned as `f32`.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use anyhow::{bail, ensure, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use zip::ZipArchive;

const MAGIC: &[u8] = b"\x93NUMPY";

static RE_DESCR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]descr['"]\s*:\s*['"](?P<v>[^'"]+)['"]"#).unwrap());
static RE_FORTRAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]fortran_order['"]\s*:\s*(?P<v>True|False)"#).unwrap());
static RE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]shape['"]\s*:\s*\((?P<v>[^)]*)\)"#).unwrap());

/// One decoded array: shape plus row-major values.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dtype {
    F32 { big_endian: bool },
    F64 { big_endian: bool },
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self> {
        let big_endian = descr.starts_with('>');
        match descr.trim_start_matches(['<', '>', '=', '|']) {
            "f4" => Ok(Self::F32 { big_endian }),
            "f8" => Ok(Self::F64 { big_endian }),
            other => bail!("Unsupported dtype '{}': expected f4 or f8", other),
        }
    }

    fn width(self) -> usize {
        match self {
            Self::F32 { .. } => 4,
            Self::F64 { .. } => 8,
        }
    }

    fn decode(self, bytes: &[u8]) -> Vec<f32> {
        match self {
            Self::F32 { big_endian } => bytes
                .chunks_exact(4)
                .map(|b| {
                    let b = [b[0], b[1], b[2], b[3]];
                    if big_endian {
                        f32::from_be_bytes(b)
                    } else {
                        f32::from_le_bytes(b)
                    }
                })
                .collect(),
            Self::F64 { big_endian } => bytes
                .chunks_exact(8)
                .map(|b| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(b);
                    let v = if big_endian {
                        f64::from_be_bytes(raw)
                    } else {
                        f64::from_le_bytes(raw)
                    };
                    v as f32
                })
                .collect(),
        }
    }
}

/// Decode one `.npy` buffer.
pub fn parse_npy(bytes: &[u8]) -> Result<NpyArray> {
    ensure!(bytes.len() >= 10 && bytes.starts_with(MAGIC), "Not an NPY buffer (bad magic)");

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            ensure!(bytes.len() >= 12, "NPY buffer too short for a v{} header", major);
            (u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, 12)
        }
        _ => bail!("Unsupported NPY format version {}", major),
    };

    let header_end = header_start + header_len;
    ensure!(bytes.len() >= header_end, "NPY header truncated");
    let header = std::str::from_utf8(&bytes[header_start..header_end])
        .context("NPY header is not UTF-8")?;

    let descr = RE_DESCR
        .captures(header)
        .map(|c| c["v"].to_string())
        .context("NPY header has no 'descr'")?;
    let dtype = Dtype::parse(&descr)?;

    if RE_FORTRAN.captures(header).is_some_and(|c| &c["v"] == "True") {
        bail!("Fortran-order arrays are not supported");
    }

    let shape_src = RE_SHAPE
        .captures(header)
        .map(|c| c["v"].to_string())
        .context("NPY header has no 'shape'")?;
    let shape = shape_src
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| dim.parse::<usize>().with_context(|| format!("Bad shape dimension '{}'", dim)))
        .collect::<Result<Vec<_>>>()?;

    let count: usize = shape.iter().product();
    let needed = count * dtype.width();
    let payload = &bytes[header_end..];
    ensure!(
        payload.len() >= needed,
        "NPY payload too short: need {} bytes, have {}",
        needed,
        payload.len()
    );

    Ok(NpyArray {
        shape,
        data: dtype.decode(&payload[..needed]),
    })
}

/// Read every array of an `.npz` archive, keyed by member name without `.npy`.
pub fn read_npz<R: Read + Seek>(reader: R) -> Result<HashMap<String, NpyArray>> {
    let mut archive = ZipArchive::new(reader).context("Not a ZIP archive")?;
    let mut arrays = HashMap::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut member = archive.by_index(index).context("Cannot read archive member")?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().trim_end_matches(".npy").to_string();
        let mut bytes = Vec::with_capacity(member.size() as usize);
        member
            .read_to_end(&mut bytes)
            .with_context(|| format!("Cannot read member '{}'", name))?;
        let array = parse_npy(&bytes).with_context(|| format!("Bad array '{}'", name))?;
        debug!(name = %name, shape = ?array.shape, "loaded array");
        arrays.insert(name, array);
    }
    Ok(arrays)
}

/// Open and read an `.npz` file.
pub fn load_npz(path: &Path) -> Result<HashMap<String, NpyArray>> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    read_npz(BufReader::new(file)).with_context(|| format!("Cannot load {}", path.display()))
}
