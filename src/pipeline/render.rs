//! PDF rasterisation via pdfium.
//!
//! pdfium keeps thread-local state and is not async-safe, so every entry
//! point here is blocking and callers run it inside `spawn_blocking`.
//!
//! Binding failures are the one place the extractor learns that the native
//! library is missing; they come back as [`ExtractError::DependencyMissing`]
//! so the caller can show an installation hint instead of a parse error.

use crate::error::{Dependency, ExtractError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Bind to a pdfium library.
///
/// Search order: the explicit path, `PDFIUM_LIB_PATH`, the working
/// directory, then the system library search path.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, ExtractError> {
    let env_path = std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty());

    let bindings = if let Some(path) = explicit {
        Pdfium::bind_to_library(path)
    } else if let Some(ref path) = env_path {
        Pdfium::bind_to_library(path)
    } else {
        Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
    }
    .map_err(|e| ExtractError::DependencyMissing(Dependency::Pdfium, format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Open a document held in memory.
pub(crate) fn load_document<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
    method: &'static str,
) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ExtractError::failed(method, format!("{:?}", e)))
}

/// Rasterise every page at `dpi`, capping either dimension at `max_pixels`.
///
/// Pages are returned in document order. The images live only as long as
/// the caller keeps them; nothing touches the file system.
pub fn render_pages_blocking(
    bytes: &[u8],
    dpi: u32,
    max_pixels: u32,
    lib_path: Option<&Path>,
) -> Result<Vec<DynamicImage>, ExtractError> {
    let pdfium = bind_pdfium(lib_path)?;
    let document = load_document(&pdfium, bytes, "render")?;

    let pages = document.pages();
    let total = pages.len() as usize;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ExtractError::failed("render", format!("page {}: {:?}", idx + 1, e)))?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    info!("Rendered {} pages at {} DPI", images.len(), dpi);
    Ok(images)
}
