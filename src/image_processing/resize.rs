use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::RgbaImage;

use super::{TargetSize, TransformError};

/// Resize an image to exactly `size`, ignoring aspect ratio.
///
/// Lanczos3 convolution in both directions, with alpha premultiplied while filtering.
pub fn resize_exact(img: RgbaImage, size: TargetSize) -> Result<RgbaImage, TransformError> {
    let (src_width, src_height) = img.dimensions();
    let (width, height) = (size.width(), size.height());

    if src_width == width && src_height == height {
        return Ok(img);
    }

    if src_width == 0 || src_height == 0 {
        return Err(TransformError::InvalidSize {
            width: src_width,
            height: src_height,
        });
    }

    let src_image = Image::from_vec_u8(src_width, src_height, img.into_raw(), PixelType::U8x4)?;
    let mut dst_image = Image::new(width, height, PixelType::U8x4);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    let mut resizer = Resizer::new();
    resizer.resize(&src_image, &mut dst_image, Some(&options))?;

    RgbaImage::from_raw(width, height, dst_image.into_vec())
        .ok_or(TransformError::InvalidSize { width, height })
}
