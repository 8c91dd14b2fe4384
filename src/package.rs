//! Single-page document packaging
//!
//! Wraps one image in a fresh PDF page whose size in points equals the
//! image size in pixels, so the embedded raster maps 1:1 onto the page.

use crate::error::RoiError;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the image XObject in the page resources
const IMAGE_NAME: &str = "Im0";

/// Summary of a written document
#[derive(Debug, Clone, Serialize)]
pub struct PackagedDocument {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Write `image` as a one-page PDF at `out`.
///
/// Grayscale images are embedded as DeviceGray, everything else as 8-bit
/// DeviceRGB (alpha is dropped). The file only appears at `out` once it has
/// been completely serialized.
pub fn package_image(image: &DynamicImage, out: &Path) -> Result<PackagedDocument, RoiError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(RoiError::InvalidInput(format!(
            "Cannot package an empty {}x{} image",
            width, height
        )));
    }

    let mut doc = build_document(image).map_err(|e| RoiError::write_failure(out, e))?;

    let dir = match out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| RoiError::write_failure(out, e))?;
    doc.save_to(tmp.as_file_mut())
        .map_err(|e| RoiError::write_failure(out, e))?;
    tmp.as_file_mut()
        .flush()
        .map_err(|e| RoiError::write_failure(out, e))?;
    tmp.persist(out)
        .map_err(|e| RoiError::write_failure(out, e.error))?;

    tracing::info!("Wrote {} ({}x{} pt page)", out.display(), width, height);

    Ok(PackagedDocument {
        path: out.to_path_buf(),
        width,
        height,
    })
}

fn build_document(image: &DynamicImage) -> Result<Document, lopdf::Error> {
    let (width, height) = (image.width() as i64, image.height() as i64);
    let (color_space, pixels) = match image {
        DynamicImage::ImageLuma8(gray) => ("DeviceGray", gray.as_raw().clone()),
        other => ("DeviceRGB", other.to_rgb8().into_raw()),
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        },
        pixels,
    );
    image_stream.compress()?;
    let image_id = doc.add_object(image_stream);

    // unit square scaled to the full page
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { IMAGE_NAME => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}
