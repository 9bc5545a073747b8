//! Opaque coordinate reference system descriptor
//!
//! A [`SpatialRef`] carries an OGC WKT definition. It is attached to datasets,
//! GCP lists and geometry fields; interpreting or transforming between
//! reference systems is left to other libraries.

use std::fmt::{Display, Formatter};

use crate::errors::{GeoDataError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpatialRef {
    wkt: String,
}

impl SpatialRef {
    /// Wraps a WKT definition after a structural check (`KEYWORD[...]` with
    /// balanced brackets).
    pub fn from_wkt(wkt: &str) -> Result<SpatialRef> {
        let wkt = wkt.trim();
        let open = wkt.find('[').ok_or_else(|| invalid_wkt(wkt))?;
        let keyword = &wkt[..open];
        if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid_wkt(wkt));
        }

        let mut depth = 0i32;
        let mut in_quotes = false;
        for (pos, c) in wkt.char_indices() {
            match c {
                '"' => in_quotes = !in_quotes,
                '[' | '(' if !in_quotes => depth += 1,
                ']' | ')' if !in_quotes => {
                    depth -= 1;
                    if depth == 0 && pos != wkt.len() - 1 {
                        return Err(invalid_wkt(wkt));
                    }
                }
                _ => {}
            }
            if depth < 0 {
                return Err(invalid_wkt(wkt));
            }
        }
        if depth != 0 || in_quotes {
            return Err(invalid_wkt(wkt));
        }

        Ok(SpatialRef {
            wkt: wkt.to_string(),
        })
    }

    pub fn to_wkt(&self) -> String {
        self.wkt.clone()
    }

    pub fn as_wkt(&self) -> &str {
        &self.wkt
    }

    /// The root keyword, e.g. `GEOGCS`, `PROJCS` or `PROJCRS`.
    pub fn kind(&self) -> &str {
        self.wkt.split('[').next().unwrap_or_default()
    }

    /// The quoted name of the root node.
    pub fn name(&self) -> Option<String> {
        let start = self.wkt.find("[\"")? + 2;
        let len = self.wkt[start..].find('"')?;
        Some(self.wkt[start..start + len].to_string())
    }

    /// The authority code of the root node as `NAME:CODE`, e.g. `EPSG:4326`.
    ///
    /// The root authority is the last `AUTHORITY[...]` (WKT1) or `ID[...]` (WKT2) node.
    pub fn authority(&self) -> Result<String> {
        let node = ["AUTHORITY[", "ID["]
            .iter()
            .filter_map(|tag| self.wkt.rfind(tag).map(|pos| pos + tag.len()))
            .max()
            .ok_or_else(|| GeoDataError::NotFound {
                what: "Authority".to_string(),
            })?;

        let body = &self.wkt[node..];
        let body = &body[..body.find(']').unwrap_or(body.len())];
        let mut parts = body
            .split(',')
            .map(|p| p.trim().trim_matches('"').to_string());
        match (parts.next(), parts.next()) {
            (Some(name), Some(code)) if !name.is_empty() && !code.is_empty() => {
                Ok(format!("{name}:{code}"))
            }
            _ => Err(GeoDataError::NotFound {
                what: "Authority".to_string(),
            }),
        }
    }
}

impl Display for SpatialRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.wkt)
    }
}

fn invalid_wkt(wkt: &str) -> GeoDataError {
    GeoDataError::BadArgument(format!("Not a WKT definition: '{wkt}'"))
}
