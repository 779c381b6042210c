use anyhow::Result;
use axum::body::Bytes;

use crate::render::Figure;

/// A figure encoded once, served from memory
pub struct EncodedFigure {
    pub name: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub png: Bytes,
}

pub struct ViewerState {
    pub figures: Vec<EncodedFigure>,
}

impl ViewerState {
    pub fn new(figures: &[Figure]) -> Result<Self> {
        let figures = figures
            .iter()
            .map(|figure| {
                Ok(EncodedFigure {
                    name: figure.name.clone(),
                    title: figure.title.clone(),
                    width: figure.width(),
                    height: figure.height(),
                    png: Bytes::from(figure.to_png()?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { figures })
    }
}
