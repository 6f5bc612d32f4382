//! Image format and compressor detection from file names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Mdv,
    Mdr,
    Z80,
    Sna,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl ImageFormat {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "mdv" => Some(ImageFormat::Mdv),
            "mdr" => Some(ImageFormat::Mdr),
            "z80" => Some(ImageFormat::Z80),
            "sna" => Some(ImageFormat::Sna),
            _ => None,
        }
    }

    /// Query value sent to the server; unknown formats go out empty so the
    /// server can sniff the content.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Mdv => "mdv",
            ImageFormat::Mdr => "mdr",
            ImageFormat::Z80 => "z80",
            ImageFormat::Sna => "sna",
            ImageFormat::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compressor {
    Gz,
    Gzip,
    Zip,
    #[serde(rename = "7z")]
    SevenZ,
    #[default]
    #[serde(rename = "")]
    None,
}

impl Compressor {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "gz" => Some(Compressor::Gz),
            "gzip" => Some(Compressor::Gzip),
            "zip" => Some(Compressor::Zip),
            "7z" => Some(Compressor::SevenZ),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compressor::Gz => "gz",
            Compressor::Gzip => "gzip",
            Compressor::Zip => "zip",
            Compressor::SevenZ => "7z",
            Compressor::None => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormatCompressor {
    pub format: ImageFormat,
    pub compressor: Compressor,
}

/// Splits `name` at its last dot into stem and lower-cased extension.
fn split_extension(name: &str) -> (&str, String) {
    match name.rfind('.') {
        Some(dot) => (&name[..dot], name[dot + 1..].to_ascii_lowercase()),
        None => (name, String::new()),
    }
}

/// Drops any directory or `repo://` prefix.
fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(slash) => &path[slash + 1..],
        None => path,
    }
}

/// Derives format and compressor from a file name or repository reference.
pub fn resolve(filename: &str) -> FormatCompressor {
    let name = base_name(filename);
    let (stem, ext) = split_extension(name);

    let (compressor, candidate) = match Compressor::from_extension(&ext) {
        Some(compressor) => (compressor, split_extension(stem).1),
        None => (Compressor::None, ext),
    };

    FormatCompressor {
        format: ImageFormat::from_extension(&candidate).unwrap_or_default(),
        compressor,
    }
}

/// Name under which an image is stored on the server: the file name without
/// its recognized compressor and format extensions. Names with neither only
/// lose their last extension.
pub fn display_name(filename: &str) -> String {
    let name = base_name(filename);
    let (stem, ext) = split_extension(name);

    let mut rest = name;
    let mut recognized = false;

    if Compressor::from_extension(&ext).is_some() {
        rest = stem;
        recognized = true;
    }

    let (stem, ext) = split_extension(rest);
    if ImageFormat::from_extension(&ext).is_some() {
        rest = stem;
        recognized = true;
    }

    if !recognized {
        rest = split_extension(name).0;
    }

    rest.to_string()
}
