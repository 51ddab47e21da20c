use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage, imageops};
use imageproc::filter::gaussian_blur_f32;
use rand::Rng;
use tracing::{debug, warn};

use crate::{
    error::{StudioError, StudioResult},
    image::{
        filters::CANONICAL_PHOTO_SIZE,
        mask::{fill_rounded_rect, flatten_onto, rounded_rect_mask, with_alpha_mask},
    },
};

pub const FRAME_WIDTH: u32 = 600;
pub const FRAME_HEIGHT: u32 = 750;
pub const PHOTO_X: u32 = (FRAME_WIDTH - CANONICAL_PHOTO_SIZE) / 2;
pub const PHOTO_Y: u32 = 50;
const SHADOW_OFFSET: i32 = 4;
const FLATTEN_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameStyle {
    Curvy,
    Classic,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StyleDescriptor {
    pub bg_color: Rgb<u8>,
    pub frame_radius: u32,
    pub photo_radius: u32,
    pub shadow_blur: f32,
    pub shadow_opacity: u8,
    pub texture_intensity: i16,
    pub premium: bool,
    pub display_name: &'static str,
    pub description: &'static str,
    pub badge: &'static str,
}

static CURVY: StyleDescriptor = StyleDescriptor {
    bg_color: Rgb([255, 255, 255]),
    frame_radius: 60,
    photo_radius: 45,
    shadow_blur: 15.0,
    shadow_opacity: 30,
    texture_intensity: 8,
    premium: true,
    display_name: "Curvy Premium",
    description: "Apple-style rounded corners with premium effects",
    badge: "Apple Style",
};

static CLASSIC: StyleDescriptor = StyleDescriptor {
    bg_color: Rgb([255, 255, 255]),
    frame_radius: 0,
    photo_radius: 0,
    shadow_blur: 8.0,
    shadow_opacity: 40,
    texture_intensity: 12,
    premium: false,
    display_name: "Classic Sharp",
    description: "Traditional polaroid with sharp edges",
    badge: "Traditional",
};

impl FrameStyle {
    pub const ALL: [FrameStyle; 2] = [FrameStyle::Curvy, FrameStyle::Classic];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "curvy" => Some(FrameStyle::Curvy),
            "classic" => Some(FrameStyle::Classic),
            _ => None,
        }
    }

    pub fn resolve(name: Option<&str>) -> Self {
        match name {
            None => FrameStyle::Curvy,
            Some(name) => FrameStyle::from_name(name).unwrap_or_else(|| {
                warn!(style = name, "unknown frame style, using curvy");
                FrameStyle::Curvy
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FrameStyle::Curvy => "curvy",
            FrameStyle::Classic => "classic",
        }
    }

    pub fn descriptor(self) -> &'static StyleDescriptor {
        match self {
            FrameStyle::Curvy => &CURVY,
            FrameStyle::Classic => &CLASSIC,
        }
    }

    fn rounds_frame(self) -> bool {
        self == FrameStyle::Curvy && self.descriptor().frame_radius > 0
    }
}

pub fn compose_polaroid<R: Rng + ?Sized>(
    photo: &RgbImage,
    style: FrameStyle,
    rng: &mut R,
) -> StudioResult<RgbImage> {
    if photo.dimensions() != (CANONICAL_PHOTO_SIZE, CANONICAL_PHOTO_SIZE) {
        return Err(StudioError::ProcessingFailed(format!(
            "frame expects a {CANONICAL_PHOTO_SIZE}x{CANONICAL_PHOTO_SIZE} photo, got {:?}",
            photo.dimensions()
        )));
    }

    let descriptor = style.descriptor();
    let paper = paper_texture(descriptor, rng);
    let shadowed = add_photo_shadow(&paper, descriptor);
    let card = place_photo(&shadowed, photo, descriptor)?;

    debug!(style = style.name(), "composed polaroid frame");
    if style.rounds_frame() {
        round_frame(&card, descriptor.frame_radius)
    } else {
        Ok(DynamicImage::ImageRgba8(card).to_rgb8())
    }
}

pub fn paper_texture<R: Rng + ?Sized>(descriptor: &StyleDescriptor, rng: &mut R) -> RgbaImage {
    let [r, g, b] = descriptor.bg_color.0;
    let mut paper = RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgba([r, g, b, 255]));
    let intensity = descriptor.texture_intensity;
    if intensity <= 0 {
        return paper;
    }

    for pixel in paper.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            let offset = rng.gen_range(-intensity..intensity);
            *channel = (i16::from(*channel) + offset).clamp(0, 255) as u8;
        }
    }
    paper
}

pub fn add_photo_shadow(canvas: &RgbaImage, descriptor: &StyleDescriptor) -> RgbaImage {
    let layer = shadow_layer(canvas.width(), canvas.height(), descriptor);
    let shadow = if descriptor.shadow_blur > 0.0 {
        gaussian_blur_f32(&layer, descriptor.shadow_blur)
    } else {
        layer
    };

    let mut result = canvas.clone();
    imageops::overlay(&mut result, &shadow, 0, 0);
    result
}

// Unblurred shadow; both corners of the shadow rectangle are inclusive.
fn shadow_layer(width: u32, height: u32, descriptor: &StyleDescriptor) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    fill_rounded_rect(
        &mut layer,
        PHOTO_X as i32 + SHADOW_OFFSET,
        PHOTO_Y as i32 + SHADOW_OFFSET,
        CANONICAL_PHOTO_SIZE + 1,
        CANONICAL_PHOTO_SIZE + 1,
        descriptor.photo_radius,
        Rgba([0, 0, 0, descriptor.shadow_opacity]),
    );
    layer
}

pub fn place_photo(
    canvas: &RgbaImage,
    photo: &RgbImage,
    descriptor: &StyleDescriptor,
) -> StudioResult<RgbaImage> {
    let photo_rgba = DynamicImage::ImageRgb8(photo.clone()).to_rgba8();
    let mut result = canvas.clone();

    if descriptor.photo_radius > 0 {
        let mask = rounded_rect_mask(photo.width(), photo.height(), descriptor.photo_radius);
        let rounded = with_alpha_mask(&photo_rgba, &mask)?;
        imageops::overlay(&mut result, &rounded, i64::from(PHOTO_X), i64::from(PHOTO_Y));
    } else {
        imageops::replace(&mut result, &photo_rgba, i64::from(PHOTO_X), i64::from(PHOTO_Y));
    }
    Ok(result)
}

pub fn round_frame(card: &RgbaImage, radius: u32) -> StudioResult<RgbImage> {
    let mask = rounded_rect_mask(card.width(), card.height(), radius);
    let rounded = with_alpha_mask(card, &mask)?;
    Ok(flatten_onto(&rounded, FLATTEN_BACKGROUND))
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use rand::{SeedableRng, rngs::StdRng};

    use super::{
        FRAME_HEIGHT, FRAME_WIDTH, FrameStyle, PHOTO_X, PHOTO_Y, add_photo_shadow,
        compose_polaroid, paper_texture, place_photo, shadow_layer,
    };
    use crate::image::filters::CANONICAL_PHOTO_SIZE;

    fn photo(color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(CANONICAL_PHOTO_SIZE, CANONICAL_PHOTO_SIZE, Rgb(color))
    }

    fn max_channel_deviation(image: &RgbaImage, base: u8) -> i16 {
        image
            .pixels()
            .flat_map(|p| p.0.into_iter().take(3))
            .map(|c| (i16::from(c) - i16::from(base)).abs())
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn style_table_matches_presets() {
        let curvy = FrameStyle::Curvy.descriptor();
        let classic = FrameStyle::Classic.descriptor();

        assert_eq!(
            (curvy.frame_radius, curvy.photo_radius, curvy.shadow_opacity),
            (60, 45, 30)
        );
        assert_eq!(
            (classic.frame_radius, classic.photo_radius, classic.shadow_opacity),
            (0, 0, 40)
        );
        assert_eq!(curvy.shadow_blur, 15.0);
        assert_eq!(classic.shadow_blur, 8.0);
        assert_eq!(curvy.bg_color, Rgb([255, 255, 255]));
    }

    #[test]
    fn unknown_style_falls_back_to_curvy() {
        assert_eq!(FrameStyle::resolve(Some("banana")), FrameStyle::Curvy);
        assert_eq!(FrameStyle::resolve(None), FrameStyle::Curvy);
        assert_eq!(FrameStyle::resolve(Some("classic")), FrameStyle::Classic);
        assert_eq!(FrameStyle::resolve(Some("Classic")), FrameStyle::Curvy);
    }

    #[test]
    fn classic_paper_is_coarser_than_curvy() {
        let mut rng = StdRng::seed_from_u64(5);

        let curvy = paper_texture(FrameStyle::Curvy.descriptor(), &mut rng);
        let classic = paper_texture(FrameStyle::Classic.descriptor(), &mut rng);

        assert_eq!(curvy.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));
        assert!(max_channel_deviation(&curvy, 255) <= 8);
        assert!(max_channel_deviation(&classic, 255) <= 12);
        assert!(max_channel_deviation(&classic, 255) > 8);
        assert!(curvy.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn shadow_darkens_offset_area_only() {
        let canvas = RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgba([255, 255, 255, 255]));

        let shadowed = add_photo_shadow(&canvas, FrameStyle::Classic.descriptor());

        let inside = shadowed.get_pixel(PHOTO_X + 250, PHOTO_Y + 250);
        assert!(inside[0] < 255);
        assert_eq!(shadowed.get_pixel(2, FRAME_HEIGHT - 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn classic_photo_is_pasted_opaquely() {
        let canvas = RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgba([255, 255, 255, 255]));

        let placed = place_photo(&canvas, &photo([10, 200, 30]), FrameStyle::Classic.descriptor())
            .expect("placement should succeed");

        assert_eq!(placed.get_pixel(PHOTO_X, PHOTO_Y), &Rgba([10, 200, 30, 255]));
        assert_eq!(placed.get_pixel(PHOTO_X - 1, PHOTO_Y), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn curvy_photo_corners_show_canvas() {
        let canvas = RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgba([255, 255, 255, 255]));

        let placed = place_photo(&canvas, &photo([10, 200, 30]), FrameStyle::Curvy.descriptor())
            .expect("placement should succeed");

        assert_eq!(placed.get_pixel(PHOTO_X, PHOTO_Y), &Rgba([255, 255, 255, 255]));
        assert_eq!(
            placed.get_pixel(PHOTO_X + 250, PHOTO_Y + 250),
            &Rgba([10, 200, 30, 255])
        );
    }

    #[test]
    fn curvy_card_has_white_rounded_corners() {
        let mut rng = StdRng::seed_from_u64(21);

        let card = compose_polaroid(&photo([40, 40, 40]), FrameStyle::Curvy, &mut rng)
            .expect("composition should succeed");

        assert_eq!(card.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));
        for (x, y) in [
            (0, 0),
            (FRAME_WIDTH - 1, 0),
            (0, FRAME_HEIGHT - 1),
            (FRAME_WIDTH - 1, FRAME_HEIGHT - 1),
        ] {
            assert_eq!(card.get_pixel(x, y), &Rgb([255, 255, 255]), "corner ({x}, {y})");
        }
        assert_eq!(card.get_pixel(300, 300), &Rgb([40, 40, 40]));
    }

    #[test]
    fn classic_card_keeps_sharp_corners() {
        let mut rng = StdRng::seed_from_u64(21);

        let card = compose_polaroid(&photo([40, 40, 40]), FrameStyle::Classic, &mut rng)
            .expect("composition should succeed");

        assert_eq!(card.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));
        assert_eq!(card.get_pixel(PHOTO_X, PHOTO_Y), &Rgb([40, 40, 40]));
        // Paper noise survives in the outer corners; rounding would whiten them.
        for (x0, y0) in [(0, 0), (FRAME_WIDTH - 10, FRAME_HEIGHT - 10)] {
            let textured = (x0..x0 + 10)
                .flat_map(|x| (y0..y0 + 10).map(move |y| (x, y)))
                .any(|(x, y)| card.get_pixel(x, y) != &Rgb([255, 255, 255]));
            assert!(textured, "corner block at ({x0}, {y0}) was flattened");
        }
    }

    #[test]
    fn shadow_rectangle_spans_inclusive_corners() {
        let classic = FrameStyle::Classic.descriptor();
        let first = PHOTO_X + 4;
        let last = first + CANONICAL_PHOTO_SIZE;

        let layer = shadow_layer(FRAME_WIDTH, FRAME_HEIGHT, classic);

        assert_eq!(layer.get_pixel(first, PHOTO_Y + 4)[3], classic.shadow_opacity);
        assert_eq!(
            layer.get_pixel(last, PHOTO_Y + 4 + CANONICAL_PHOTO_SIZE)[3],
            classic.shadow_opacity
        );
        assert_eq!(layer.get_pixel(last + 1, PHOTO_Y + 4)[3], 0);
        assert_eq!(layer.get_pixel(first - 1, PHOTO_Y + 4)[3], 0);
    }

    #[test]
    fn wrong_photo_size_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);

        let result = compose_polaroid(&RgbImage::new(400, 400), FrameStyle::Classic, &mut rng);

        assert!(result.is_err());
    }
}
