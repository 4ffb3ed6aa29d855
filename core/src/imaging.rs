// mapofus/src/imaging.rs

//! Derives the fixed-size variants stored for every order.

use crate::error::{MapError, MapResult};
use crate::model::ImageVariant;
use crate::providers::GeneratedImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSpec {
  pub width: u32,
  pub height: u32,
  pub quality: u8,
  /// Bits kept per channel; `None` keeps all eight.
  pub posterize_bits: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationSpec {
  pub thumbnail: VariantSpec,
  pub poster: VariantSpec,
  pub wallpaper: VariantSpec,
}

impl Default for DerivationSpec {
  fn default() -> Self {
    Self {
      // Deliberately degraded: this is what unpaid users see.
      thumbnail: VariantSpec {
        width: 400,
        height: 400,
        quality: 40,
        posterize_bits: Some(5),
      },
      poster: VariantSpec {
        width: 2048,
        height: 2048,
        quality: 92,
        posterize_bits: None,
      },
      wallpaper: VariantSpec {
        width: 1080,
        height: 1920,
        quality: 90,
        posterize_bits: None,
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedImage {
  pub variant: ImageVariant,
  pub bytes: Vec<u8>,
  pub content_type: String,
  pub extension: &'static str,
}

pub fn extension_for(content_type: &str) -> &'static str {
  match content_type {
    "image/png" => "png",
    "image/jpeg" | "image/jpg" => "jpg",
    "image/webp" => "webp",
    "image/gif" => "gif",
    _ => "bin",
  }
}

/// Alpha is composited onto white; JPEG has no transparency.
fn flatten(source: &DynamicImage) -> RgbImage {
  let rgba = source.to_rgba8();
  let mut flat = RgbImage::new(rgba.width(), rgba.height());
  for (x, y, pixel) in rgba.enumerate_pixels() {
    let alpha = u16::from(pixel[3]);
    let blend = |channel: u8| -> u8 { (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8 };
    flat.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
  }
  flat
}

fn posterize(image: &mut RgbImage, bits: u8) {
  let bits = bits.clamp(1, 8);
  let mask = 0xFFu8 << (8 - bits);
  for pixel in image.pixels_mut() {
    for channel in pixel.0.iter_mut() {
      *channel &= mask;
    }
  }
}

fn render(source: &RgbImage, spec: &VariantSpec) -> MapResult<Vec<u8>> {
  let mut resized = DynamicImage::ImageRgb8(source.clone())
    .resize_to_fill(spec.width, spec.height, FilterType::Triangle)
    .to_rgb8();
  if let Some(bits) = spec.posterize_bits {
    posterize(&mut resized, bits);
  }
  let mut bytes = Vec::new();
  let mut encoder = JpegEncoder::new_with_quality(&mut bytes, spec.quality);
  encoder
    .encode_image(&resized)
    .map_err(|e| MapError::Internal(format!("jpeg encoding failed: {e}")))?;
  Ok(bytes)
}

/// Produces thumbnail, base, poster and wallpaper in that order.
///
/// Output depends only on the source bytes and `spec`.
pub fn derive_variants(source: &GeneratedImage, spec: &DerivationSpec) -> MapResult<Vec<DerivedImage>> {
  let decoded = image::load_from_memory(&source.bytes).map_err(|e| {
    MapError::provider(&source.provider, None, format!("generated image could not be decoded: {e}"))
  })?;
  let flat = flatten(&decoded);

  let jpeg = |variant: ImageVariant, variant_spec: &VariantSpec| -> MapResult<DerivedImage> {
    Ok(DerivedImage {
      variant,
      bytes: render(&flat, variant_spec)?,
      content_type: "image/jpeg".to_string(),
      extension: "jpg",
    })
  };

  Ok(vec![
    jpeg(ImageVariant::Thumbnail, &spec.thumbnail)?,
    DerivedImage {
      variant: ImageVariant::Base,
      bytes: source.bytes.clone(),
      content_type: source.content_type.clone(),
      extension: extension_for(&source.content_type),
    },
    jpeg(ImageVariant::Poster, &spec.poster)?,
    jpeg(ImageVariant::Wallpaper, &spec.wallpaper)?,
  ])
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::ImageFormat;
  use std::io::Cursor;

  fn png(width: u32, height: u32) -> GeneratedImage {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
      .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
      .unwrap();
    GeneratedImage {
      bytes,
      content_type: "image/png".into(),
      provider: "test".into(),
    }
  }

  fn small_spec() -> DerivationSpec {
    DerivationSpec {
      thumbnail: VariantSpec {
        width: 40,
        height: 40,
        quality: 40,
        posterize_bits: Some(5),
      },
      poster: VariantSpec {
        width: 96,
        height: 96,
        quality: 92,
        posterize_bits: None,
      },
      wallpaper: VariantSpec {
        width: 54,
        height: 96,
        quality: 90,
        posterize_bits: None,
      },
    }
  }

  #[test]
  fn produces_four_variants_with_requested_dimensions() {
    let source = png(120, 80);
    let spec = small_spec();
    let variants = derive_variants(&source, &spec).unwrap();
    let order: Vec<_> = variants.iter().map(|v| v.variant).collect();
    assert_eq!(order, ImageVariant::ALL.to_vec());

    let dims = |v: &DerivedImage| {
      let img = image::load_from_memory(&v.bytes).unwrap();
      (img.width(), img.height())
    };
    assert_eq!(dims(&variants[0]), (40, 40));
    assert_eq!(dims(&variants[2]), (96, 96));
    assert_eq!(dims(&variants[3]), (54, 96));
    assert_eq!(variants[1].bytes, source.bytes);
    assert_eq!(variants[1].extension, "png");
    assert_eq!(variants[3].content_type, "image/jpeg");
  }

  #[test]
  fn derivation_is_reproducible() {
    let source = png(64, 64);
    let a = derive_variants(&source, &small_spec()).unwrap();
    let b = derive_variants(&source, &small_spec()).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn posterize_drops_low_bits() {
    let mut img = RgbImage::from_pixel(1, 1, Rgb([0xFF, 0x0F, 0x87]));
    posterize(&mut img, 5);
    assert_eq!(img.get_pixel(0, 0).0, [0xF8, 0x08, 0x80]);
  }

  #[test]
  fn undecodable_source_is_a_provider_error() {
    let source = GeneratedImage {
      bytes: b"<svg/>".to_vec(),
      content_type: "image/svg+xml".into(),
      provider: "openai".into(),
    };
    let err = derive_variants(&source, &DerivationSpec::default()).unwrap_err();
    assert!(matches!(err, MapError::Provider { ref provider, .. } if provider == "openai"));
  }
}
