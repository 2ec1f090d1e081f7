use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, request::Parts},
};

const DEPTH_HEADER: HeaderName = HeaderName::from_static("depth");

/// Valor del header `Depth` de WebDAV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Solo el recurso.
    Zero,
    /// El recurso y sus hijos directos.
    One,
    /// Un numero arbitrario de niveles.
    Levels(u32),
    /// Todo el subarbol.
    #[default]
    Infinity,
}

impl Depth {
    /// Parsea el valor del header; ausente o invalido equivale a infinito.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("0") => Self::Zero,
            Some("1") => Self::One,
            Some(other) => match other.parse::<u32>() {
                Ok(levels) => Self::Levels(levels),
                Err(_) => Self::Infinity,
            },
            None => Self::Infinity,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::parse(headers.get(&DEPTH_HEADER).and_then(|v| v.to_str().ok()))
    }

    /// Levels to descend; `-1` means unlimited.
    pub fn levels(&self) -> i32 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Levels(levels) => i32::try_from(*levels).unwrap_or(-1),
            Self::Infinity => -1,
        }
    }
}

impl<S> FromRequestParts<S> for Depth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
