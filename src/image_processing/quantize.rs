//! Adaptive palette reduction (median cut over RGBA)

use image::RgbaImage;
use std::collections::HashMap;

/// An 8-bit palette image: one palette index per pixel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<[u8; 4]>,
    pub indices: Vec<u8>,
}

impl IndexedImage {
    /// Whether any palette entry is not fully opaque
    pub fn has_transparency(&self) -> bool {
        self.palette.iter().any(|c| c[3] < 255)
    }
}

/// A set of distinct colors (with pixel counts) that will share one palette entry
struct ColorBox {
    colors: Vec<([u8; 4], u32)>,
    channel: usize,
    range: u8,
    population: u64,
}

impl ColorBox {
    fn new(colors: Vec<([u8; 4], u32)>) -> Self {
        let (channel, range) = widest_channel(&colors);
        let population = colors.iter().map(|&(_, n)| n as u64).sum();
        Self {
            colors,
            channel,
            range,
            population,
        }
    }

    /// Split at the pixel-weighted median of the widest channel
    fn split(mut self) -> (ColorBox, ColorBox) {
        let channel = self.channel;
        self.colors.sort_by_key(|&(color, _)| color[channel]);

        let half = self.population / 2;
        let mut running = 0u64;
        let mut at = self.colors.len() / 2;
        for (i, &(_, n)) in self.colors.iter().enumerate() {
            running += n as u64;
            if running >= half {
                at = i + 1;
                break;
            }
        }
        let at = at.clamp(1, self.colors.len() - 1);

        let upper = self.colors.split_off(at);
        (ColorBox::new(self.colors), ColorBox::new(upper))
    }

    /// Pixel-weighted mean color
    fn average(&self) -> [u8; 4] {
        let total = self.population.max(1);
        let mut sums = [0u64; 4];
        for &(color, n) in &self.colors {
            for c in 0..4 {
                sums[c] += color[c] as u64 * n as u64;
            }
        }
        sums.map(|s| ((s + total / 2) / total) as u8)
    }
}

/// Reduce an image to at most `max_colors` palette entries chosen from its own colors.
///
/// Images that already use `max_colors` or fewer distinct colors are mapped
/// losslessly. Output is deterministic for a given input.
pub fn quantize(img: &RgbaImage, max_colors: usize) -> IndexedImage {
    let max_colors = max_colors.clamp(1, 256);
    let (width, height) = img.dimensions();

    let mut histogram: HashMap<[u8; 4], u32> = HashMap::new();
    for pixel in img.pixels() {
        *histogram.entry(normalize(pixel.0)).or_insert(0) += 1;
    }

    // HashMap order is random; sort so palettes are reproducible
    let mut colors: Vec<([u8; 4], u32)> = histogram.into_iter().collect();
    colors.sort_unstable_by_key(|&(color, _)| color);

    let mut lookup: HashMap<[u8; 4], u8> = HashMap::with_capacity(colors.len());
    let palette = if colors.len() <= max_colors {
        for (i, &(color, _)) in colors.iter().enumerate() {
            lookup.insert(color, i as u8);
        }
        colors.iter().map(|&(color, _)| color).collect()
    } else {
        let boxes = median_cut(colors, max_colors);
        let mut palette = Vec::with_capacity(boxes.len());
        for (i, color_box) in boxes.iter().enumerate() {
            for &(color, _) in &color_box.colors {
                lookup.insert(color, i as u8);
            }
            palette.push(color_box.average());
        }
        palette
    };

    let indices = img
        .pixels()
        .map(|p| lookup.get(&normalize(p.0)).copied().unwrap_or(0))
        .collect();

    IndexedImage {
        width,
        height,
        palette,
        indices,
    }
}

fn median_cut(colors: Vec<([u8; 4], u32)>, max_colors: usize) -> Vec<ColorBox> {
    let mut boxes = vec![ColorBox::new(colors)];

    while boxes.len() < max_colors {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1)
            .max_by_key(|(_, b)| (b.range, b.population))
            .map(|(i, _)| i);

        let Some(index) = candidate else {
            break;
        };

        let (lower, upper) = boxes.swap_remove(index).split();
        boxes.push(lower);
        boxes.push(upper);
    }

    boxes
}

/// Widest channel of a color set and its value range
fn widest_channel(colors: &[([u8; 4], u32)]) -> (usize, u8) {
    let mut min = [u8::MAX; 4];
    let mut max = [u8::MIN; 4];
    for (color, _) in colors {
        for c in 0..4 {
            min[c] = min[c].min(color[c]);
            max[c] = max[c].max(color[c]);
        }
    }

    (0..4)
        .map(|c| (c, max[c].saturating_sub(min[c])))
        .fold((0, 0), |best, cur| if cur.1 > best.1 { cur } else { best })
}

/// Every fully transparent pixel shares one entry
fn normalize(color: [u8; 4]) -> [u8; 4] {
    if color[3] == 0 {
        [0, 0, 0, 0]
    } else {
        color
    }
}
