//! # Stl
//!
//! Reader for binary and ASCII STL files. Produces the raw triangle soup
//! exactly as stored in the file; welding and topology live in [`crate::mesh`].

use crate::config::StlFormat;
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use nom::{
    bytes::complete::tag_no_case,
    character::complete::{multispace0, multispace1, not_line_ending},
    number::complete::float,
    sequence::{preceded, tuple},
    IResult,
};
use std::{
    fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
};
use thiserror::Error;

const HEADER_LEN: usize = 80;
const PREAMBLE_LEN: usize = HEADER_LEN + 4;
const RECORD_LEN: usize = 50;
const ASCII_PROBE_LEN: usize = 1024;

#[derive(Error, Debug)]
/// Error types for reading STL data
pub enum ParseError {
    #[error("couldn't read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("STL data is empty")]
    Empty,
    #[error("binary STL is {len} bytes, too short for the 84 byte header")]
    TruncatedHeader { len: usize },
    #[error("binary STL declares {declared} triangles but only {available} fit in the file")]
    Truncated { declared: usize, available: usize },
    #[error("malformed ASCII STL at line {line}: near `{near}`")]
    Ascii { line: usize, near: String },
    #[error("error reading binary STL record: {0}")]
    Read(#[source] io::Error),
}

/// One facet as stored in the file, before any deduplication
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawTriangle {
    pub normal: [f32; 3],
    pub vertices: [[f32; 3]; 3],
    pub attr_byte_count: u16,
}

impl RawTriangle {
    /// Facet with a zero normal, which the mesh builder recomputes from the winding
    pub fn new(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> RawTriangle {
        RawTriangle {
            normal: [0., 0., 0.],
            vertices: [v0, v1, v2],
            attr_byte_count: 0,
        }
    }

    /// Same facet with the opposite winding
    pub fn flipped(&self) -> RawTriangle {
        let [v0, v1, v2] = self.vertices;
        let [nx, ny, nz] = self.normal;
        RawTriangle {
            normal: [-nx, -ny, -nz],
            vertices: [v0, v2, v1],
            attr_byte_count: self.attr_byte_count,
        }
    }
}

/// Read and parse an STL file from disk
pub fn read_stl_file<P: AsRef<Path>>(path: P, format: StlFormat) -> Result<Vec<RawTriangle>, ParseError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {:?}", data.len(), path);
    parse_with(&data, format)
}

/// Parse STL data, detecting binary or ASCII
///
/// # Examples
///
/// ```
/// use stl_analyzer::stl::parse;
/// let text = "solid t\n facet normal 0 0 1\n  outer loop\n   vertex 0 0 0\n   vertex 1 0 0\n   vertex 0 1 0\n  endloop\n endfacet\nendsolid t\n";
/// let tris = parse(text.as_bytes()).unwrap();
/// assert_eq!(tris.len(), 1);
/// assert_eq!(tris[0].vertices[1], [1., 0., 0.]);
/// ```
pub fn parse(data: &[u8]) -> Result<Vec<RawTriangle>, ParseError> { parse_with(data, StlFormat::Auto) }

/// Parse STL data with an explicit format, `Auto` falls back to detection
pub fn parse_with(data: &[u8], format: StlFormat) -> Result<Vec<RawTriangle>, ParseError> {
    if data.is_empty() {
        return Err(ParseError::Empty);
    }
    let format = match format {
        StlFormat::Auto => detect_format(data),
        forced => forced,
    };
    debug!("parsing STL as {:?}", format);
    match format {
        StlFormat::Ascii => parse_ascii(&String::from_utf8_lossy(data)),
        _ => parse_binary(data),
    }
}

/// Guess the encoding of STL data
///
/// A declared triangle count that exactly matches the file size wins over a
/// `solid` prefix, since some exporters write `solid` into binary headers.
pub fn detect_format(data: &[u8]) -> StlFormat {
    if let Some(declared) = declared_count(data) {
        if declared
            .checked_mul(RECORD_LEN)
            .and_then(|body| body.checked_add(PREAMBLE_LEN))
            == Some(data.len())
        {
            return StlFormat::Binary;
        }
    }
    if looks_like_ascii(data) {
        StlFormat::Ascii
    } else {
        StlFormat::Binary
    }
}

fn declared_count(data: &[u8]) -> Option<usize> {
    if data.len() < PREAMBLE_LEN {
        return None;
    }
    let mut count = &data[HEADER_LEN..PREAMBLE_LEN];
    count.read_u32::<LittleEndian>().ok().map(|n| n as usize)
}

fn looks_like_ascii(data: &[u8]) -> bool {
    let start = data.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(data.len());
    let text = &data[start..];
    let head = text[..text.len().min(ASCII_PROBE_LEN)].to_ascii_lowercase();
    let has = |word: &[u8]| head.windows(word.len()).any(|w| w == word);
    head.starts_with(b"solid") && (has(&b"facet"[..]) || has(&b"endsolid"[..]))
}

fn read_point<T: ReadBytesExt>(input: &mut T) -> io::Result<[f32; 3]> {
    let x1 = input.read_f32::<LittleEndian>()?;
    let x2 = input.read_f32::<LittleEndian>()?;
    let x3 = input.read_f32::<LittleEndian>()?;

    Ok([x1, x2, x3])
}

fn read_triangle<T: ReadBytesExt>(input: &mut T) -> io::Result<RawTriangle> {
    let normal = read_point(input)?;
    let v1 = read_point(input)?;
    let v2 = read_point(input)?;
    let v3 = read_point(input)?;
    let attr_count = input.read_u16::<LittleEndian>()?;

    Ok(RawTriangle {
        normal,
        vertices: [v1, v2, v3],
        attr_byte_count: attr_count,
    })
}

/// Parse binary STL data
pub fn parse_binary(data: &[u8]) -> Result<Vec<RawTriangle>, ParseError> {
    let declared = declared_count(data).ok_or(ParseError::TruncatedHeader { len: data.len() })?;
    let available = (data.len() - PREAMBLE_LEN) / RECORD_LEN;
    if declared > available {
        return Err(ParseError::Truncated { declared, available });
    }
    if available > declared {
        debug!("ignoring {} trailing bytes after binary STL records", data.len() - PREAMBLE_LEN - declared * RECORD_LEN);
    }

    let mut input = Cursor::new(&data[PREAMBLE_LEN..]);
    let mut triangles = Vec::with_capacity(declared);
    for _ in 0..declared {
        triangles.push(read_triangle(&mut input).map_err(ParseError::Read)?);
    }
    Ok(triangles)
}

/// Parse ASCII STL text
pub fn parse_ascii(text: &str) -> Result<Vec<RawTriangle>, ParseError> {
    let at = |rest: &str| ascii_error(text, rest);

    let (mut input, name) = solid_header(text).map_err(|e| at(failed_at(e, text)))?;
    debug!("ASCII solid {:?}", name.trim());

    let mut triangles = Vec::new();
    loop {
        if let Ok((rest, _)) = endsolid(input) {
            if !rest.trim().is_empty() {
                debug!("ignoring content after endsolid at line {}", line_of(text, rest));
            }
            return Ok(triangles);
        }
        let (rest, triangle) = facet(input).map_err(|e| at(failed_at(e, input)))?;
        triangles.push(triangle);
        input = rest;
    }
}

fn failed_at<'a>(err: nom::Err<nom::error::Error<&'a str>>, fallback: &'a str) -> &'a str {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
        nom::Err::Incomplete(_) => fallback,
    }
}

fn line_of(text: &str, rest: &str) -> usize {
    let offset = text.len() - rest.len();
    text[..offset].matches('\n').count() + 1
}

fn ascii_error(text: &str, rest: &str) -> ParseError {
    let offset = text.len() - rest.len();
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let near = text[line_start..].lines().next().map(str::trim).unwrap_or("");
    ParseError::Ascii {
        line: line_of(text, rest),
        near: if near.is_empty() {
            "end of input".to_string()
        } else {
            near.to_string()
        },
    }
}

fn solid_header(input: &str) -> IResult<&str, &str> {
    let (input, _) = preceded(multispace0, tag_no_case("solid"))(input)?;
    not_line_ending(input)
}

fn endsolid(input: &str) -> IResult<&str, &str> {
    let (input, _) = preceded(multispace0, tag_no_case("endsolid"))(input)?;
    not_line_ending(input)
}

fn facet(input: &str) -> IResult<&str, RawTriangle> {
    let (input, _) = preceded(multispace0, tag_no_case("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("normal"))(input)?;
    let (input, normal) = vector3(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("loop"))(input)?;
    let (input, v0) = vertex(input)?;
    let (input, v1) = vertex(input)?;
    let (input, v2) = vertex(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endfacet"))(input)?;

    Ok((
        input,
        RawTriangle {
            normal,
            vertices: [v0, v1, v2],
            attr_byte_count: 0,
        },
    ))
}

fn vertex(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, _) = preceded(multispace0, tag_no_case("vertex"))(input)?;
    vector3(input)
}

fn vector3(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, (x, y, z)) = tuple((
        preceded(multispace1, float),
        preceded(multispace1, float),
        preceded(multispace1, float),
    ))(input)?;
    Ok((input, [x, y, z]))
}
