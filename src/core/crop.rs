use image::{imageops, Rgba, RgbaImage};

use crate::core::geometry::Rect;

/// Value of destination pixels whose source lies outside the page.
pub const CROP_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Copies `rect` out of `page` into a new `rect.width() x rect.height()`
/// raster.
///
/// Total over all rectangles: any part of `rect` past the decoded page
/// (scanner or DPI drift) is left at [`CROP_BACKGROUND`].
pub fn crop(page: &RgbaImage, rect: &Rect) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(rect.width(), rect.height(), CROP_BACKGROUND);

    let Some(visible) = rect.clip_to(page.width(), page.height()) else {
        return out;
    };

    let source = imageops::crop_imm(
        page,
        visible.x_min() as u32,
        visible.y_min() as u32,
        visible.width(),
        visible.height(),
    )
    .to_image();

    imageops::replace(
        &mut out,
        &source,
        i64::from(visible.x_min()) - i64::from(rect.x_min()),
        i64::from(visible.y_min()) - i64::from(rect.y_min()),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 7, 255]))
    }

    #[test]
    fn inside_crop_matches_source() {
        let page = gradient(50, 40);
        let rect = Rect::new(10, 5, 30, 25);
        let tile = crop(&page, &rect);

        assert_eq!(tile.dimensions(), (20, 20));
        for (x, y, pixel) in tile.enumerate_pixels() {
            assert_eq!(*pixel, *page.get_pixel(x + 10, y + 5));
        }
    }

    #[test]
    fn overhanging_crop_fills_background() {
        let page = gradient(20, 20);
        let rect = Rect::new(15, -3, 25, 5);
        let tile = crop(&page, &rect);

        assert_eq!(tile.dimensions(), (10, 8));
        assert_eq!(*tile.get_pixel(0, 0), CROP_BACKGROUND);
        assert_eq!(*tile.get_pixel(0, 3), *page.get_pixel(15, 0));
        assert_eq!(*tile.get_pixel(4, 7), *page.get_pixel(19, 4));
        assert_eq!(*tile.get_pixel(5, 7), CROP_BACKGROUND);
    }

    #[test]
    fn disjoint_crop_is_all_background() {
        let page = gradient(10, 10);
        let tile = crop(&page, &Rect::new(100, 100, 104, 103));
        assert_eq!(tile.dimensions(), (4, 3));
        assert!(tile.pixels().all(|p| *p == CROP_BACKGROUND));
    }
}
