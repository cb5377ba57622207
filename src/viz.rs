//! Turn numeric arrays and rendered plots into `data:` URIs for `Img` components.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::components::html;
use crate::handler::{callback_fn, CallbackFn};

pub const PNG_URI_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
pub enum VizError {
    #[error("cannot render an empty array")]
    EmptyArray,

    #[error("expected {expected} values for a {rows}x{cols} array, got {got}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
        got: usize,
    },

    #[error("unknown colormap '{0}' (expected RdBu, gray or viridis)")]
    UnknownColormap(String),

    #[error("png encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Row-major 2-D array.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

pub type ImageArray = Grid<f32>;

impl<T: Clone> Grid<T> {
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, VizError> {
        if data.len() != rows * cols {
            return Err(VizError::ShapeMismatch {
                rows,
                cols,
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build from nested rows; every row must have the first row's length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, VizError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let data: Vec<T> = rows.into_iter().flatten().collect();
        Self::new(n_rows, n_cols, data)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[row * self.cols + col]
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl ImageArray {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn eye(n: usize) -> Self {
        let mut grid = Self::zeros(n, n);
        for i in 0..n {
            grid.data[i * n + i] = 1.0;
        }
        grid
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PadMode<T> {
    /// Mirror around the edge without repeating it (`[1,2,3]` -> `3,2 | 1,2,3 | 2,1`).
    Reflect,
    Constant(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMode {
    #[default]
    Center,
    Random,
}

/// Pad every axis whose target is larger than the current size. The extra
/// goes half before, half after, with the odd element after. Axes with a
/// `None` or smaller target are left alone.
pub fn pad_to_shape<T: Clone>(
    grid: &Grid<T>,
    shape: [Option<usize>; 2],
    mode: &PadMode<T>,
) -> Result<Grid<T>, VizError> {
    if grid.is_empty() {
        return Err(VizError::EmptyArray);
    }
    let (row_before, rows) = pad_extent(grid.rows, shape[0]);
    let (col_before, cols) = pad_extent(grid.cols, shape[1]);

    let mut data = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        let src_r = source_index(r as isize - row_before as isize, grid.rows);
        for c in 0..cols {
            let src_c = source_index(c as isize - col_before as isize, grid.cols);
            let value = match (mode, src_r, src_c) {
                (_, Inside(r), Inside(c)) => grid.get(r, c).clone(),
                (PadMode::Constant(v), _, _) => v.clone(),
                (PadMode::Reflect, r, c) => grid.get(r.reflected(grid.rows), c.reflected(grid.cols)).clone(),
            };
            data.push(value);
        }
    }
    Grid::new(rows, cols, data)
}

/// Pad then crop so every axis with a target ends up exactly that size.
pub fn force_shape<T: Clone, R: Rng + ?Sized>(
    grid: &Grid<T>,
    shape: [Option<usize>; 2],
    pad_mode: &PadMode<T>,
    crop_mode: CropMode,
    rng: &mut R,
) -> Result<Grid<T>, VizError> {
    let padded = pad_to_shape(grid, shape, pad_mode)?;
    let (r0, rows) = crop_window(padded.rows, shape[0], crop_mode, rng);
    let (c0, cols) = crop_window(padded.cols, shape[1], crop_mode, rng);
    if (rows, cols) == padded.shape() {
        return Ok(padded);
    }

    let mut data = Vec::with_capacity(rows * cols);
    for r in r0..r0 + rows {
        for c in c0..c0 + cols {
            data.push(padded.get(r, c).clone());
        }
    }
    Grid::new(rows, cols, data)
}

fn pad_extent(current: usize, target: Option<usize>) -> (usize, usize) {
    match target {
        Some(t) if t > current => ((t - current) / 2, t),
        _ => (0, current),
    }
}

fn crop_window<R: Rng + ?Sized>(
    current: usize,
    target: Option<usize>,
    mode: CropMode,
    rng: &mut R,
) -> (usize, usize) {
    match target {
        Some(t) if t < current => {
            let start = match mode {
                CropMode::Center => (current - t) / 2,
                CropMode::Random => rng.gen_range(0..=current - t),
            };
            (start, t)
        }
        _ => (0, current),
    }
}

#[derive(Debug, Clone, Copy)]
enum SourceIndex {
    Inside(usize),
    Outside(isize),
}
use SourceIndex::{Inside, Outside};

impl SourceIndex {
    fn reflected(self, n: usize) -> usize {
        match self {
            Inside(i) => i,
            Outside(_) if n == 1 => 0,
            Outside(i) => {
                let period = 2 * (n as isize - 1);
                let m = i.rem_euclid(period);
                if m >= n as isize {
                    (period - m) as usize
                } else {
                    m as usize
                }
            }
        }
    }
}

fn source_index(i: isize, n: usize) -> SourceIndex {
    if i >= 0 && (i as usize) < n {
        Inside(i as usize)
    } else {
        Outside(i)
    }
}

/// Colormaps available for [`array_to_uri`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    #[default]
    RdBu,
    Gray,
    Viridis,
}

const RDBU: [[u8; 3]; 11] = [
    [0x67, 0x00, 0x1f],
    [0xb2, 0x18, 0x2b],
    [0xd6, 0x60, 0x4d],
    [0xf4, 0xa5, 0x82],
    [0xfd, 0xdb, 0xc7],
    [0xf7, 0xf7, 0xf7],
    [0xd1, 0xe5, 0xf0],
    [0x92, 0xc5, 0xde],
    [0x43, 0x93, 0xc3],
    [0x21, 0x66, 0xac],
    [0x05, 0x30, 0x61],
];

const GRAY: [[u8; 3]; 2] = [[0, 0, 0], [255, 255, 255]];

const VIRIDIS: [[u8; 3]; 10] = [
    [0x44, 0x01, 0x54],
    [0x48, 0x28, 0x78],
    [0x3e, 0x49, 0x89],
    [0x31, 0x68, 0x8e],
    [0x26, 0x82, 0x8e],
    [0x1f, 0x9e, 0x89],
    [0x35, 0xb7, 0x79],
    [0x6e, 0xce, 0x58],
    [0xb5, 0xde, 0x2b],
    [0xfd, 0xe7, 0x25],
];

impl Colormap {
    fn anchors(self) -> &'static [[u8; 3]] {
        match self {
            Colormap::RdBu => &RDBU,
            Colormap::Gray => &GRAY,
            Colormap::Viridis => &VIRIDIS,
        }
    }

    /// Color for `t` in `[0, 1]`; values outside are clamped, NaN maps to 0.
    pub fn rgba(self, t: f32) -> [u8; 4] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let anchors = self.anchors();
        let pos = t * (anchors.len() - 1) as f32;
        let lo = (pos.floor() as usize).min(anchors.len() - 1);
        let hi = (lo + 1).min(anchors.len() - 1);
        let frac = pos - lo as f32;
        let mut out = [0, 0, 0, 255];
        for ch in 0..3 {
            let a = anchors[lo][ch] as f32;
            let b = anchors[hi][ch] as f32;
            out[ch] = (a + (b - a) * frac).round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

impl FromStr for Colormap {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rdbu" => Ok(Self::RdBu),
            "gray" | "grey" => Ok(Self::Gray),
            "viridis" => Ok(Self::Viridis),
            _ => Err(VizError::UnknownColormap(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Colormap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How an array becomes an image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    pub colormap: Colormap,
    /// Standardize to mean 0.5, unit std, before applying the colormap.
    pub normalize: bool,
    pub width: u32,
    pub height: u32,
    /// Emit RGBA; RGB otherwise.
    pub alpha: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            colormap: Colormap::RdBu,
            normalize: true,
            width: 128,
            height: 128,
            alpha: true,
        }
    }
}

/// Render a 2-D array to a PNG data URI.
///
/// The array is normalized, colored, padded to a square by reflection (so
/// the aspect ratio survives resizing), resized to the requested size and
/// encoded.
pub fn array_to_uri(array: &ImageArray, options: &ImageOptions) -> Result<String, VizError> {
    let png = array_to_png(array, options)?;
    Ok(png_to_uri(&png))
}

pub fn array_to_png(array: &ImageArray, options: &ImageOptions) -> Result<Vec<u8>, VizError> {
    if array.is_empty() {
        return Err(VizError::EmptyArray);
    }
    let scaled = if options.normalize {
        normalize(array)
    } else {
        array.clone()
    };
    let colored = scaled.map(|&v| options.colormap.rgba(v));

    let (rows, cols) = colored.shape();
    let side = rows.max(cols);
    let square = force_shape(
        &colored,
        [Some(side), Some(side)],
        &PadMode::Reflect,
        CropMode::Center,
        &mut rand::thread_rng(),
    )?;
    let resized = resize_bilinear(&square, options.width as usize, options.height as usize);
    encode_png(&resized, options.alpha)
}

/// Wrap PNG bytes, e.g. a plot rendered elsewhere, as a data URI.
pub fn png_to_uri(png: &[u8]) -> String {
    format!("{}{}", PNG_URI_PREFIX, STANDARD.encode(png))
}

fn normalize(array: &ImageArray) -> ImageArray {
    let mean = array.mean();
    let var = array.data.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / array.data.len() as f32;
    let std = var.sqrt();
    array.map(|&v| {
        let z = if std > 0.0 { (v - mean) / std } else { 0.0 };
        (z + 0.5).clamp(0.0, 1.0)
    })
}

fn resize_bilinear(src: &Grid<[u8; 4]>, width: usize, height: usize) -> Grid<[u8; 4]> {
    let (src_rows, src_cols) = src.shape();
    let scale_y = src_rows as f32 / height as f32;
    let scale_x = src_cols as f32 / width as f32;
    let sample = |pos: f32, n: usize| -> (usize, usize, f32) {
        let p = pos.clamp(0.0, (n - 1) as f32);
        let lo = p.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        (lo, hi, p - lo as f32)
    };

    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        let (y0, y1, fy) = sample((y as f32 + 0.5) * scale_y - 0.5, src_rows);
        for x in 0..width {
            let (x0, x1, fx) = sample((x as f32 + 0.5) * scale_x - 0.5, src_cols);
            let mut px = [0u8; 4];
            for (ch, out) in px.iter_mut().enumerate() {
                let top = lerp(src.get(y0, x0)[ch], src.get(y0, x1)[ch], fx);
                let bottom = lerp(src.get(y1, x0)[ch], src.get(y1, x1)[ch], fx);
                *out = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8;
            }
            data.push(px);
        }
    }
    Grid {
        rows: height,
        cols: width,
        data,
    }
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    a as f32 + (b as f32 - a as f32) * t
}

pub fn encode_png(pixels: &Grid<[u8; 4]>, alpha: bool) -> Result<Vec<u8>, VizError> {
    let (rows, cols) = pixels.shape();
    let (color, bytes): (png::ColorType, Vec<u8>) = if alpha {
        (png::ColorType::Rgba, pixels.data.iter().flatten().copied().collect())
    } else {
        (
            png::ColorType::Rgb,
            pixels.data.iter().flat_map(|px| [px[0], px[1], px[2]]).collect(),
        )
    };

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, cols as u32, rows as u32);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&bytes)?;
        writer.finish()?;
    }
    Ok(buf)
}

/// What an image handler may return.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Array(ImageArray),
    /// Already-encoded PNG, e.g. from a plotting backend.
    Png(Vec<u8>),
}

impl ImageSource {
    pub fn to_uri(&self, options: &ImageOptions) -> Result<String, VizError> {
        match self {
            ImageSource::Array(a) => array_to_uri(a, options),
            ImageSource::Png(bytes) => Ok(png_to_uri(bytes)),
        }
    }
}

impl From<ImageArray> for ImageSource {
    fn from(a: ImageArray) -> Self {
        ImageSource::Array(a)
    }
}

/// Wrap an image-producing handler so it returns an `Img` component. The
/// result is not registered anywhere; pass it to
/// [`EasyDash::callback`](crate::EasyDash::callback) or use
/// [`EasyDash::image_callback`](crate::EasyDash::image_callback).
pub fn image_handler<F>(options: ImageOptions, f: F) -> CallbackFn
where
    F: Fn(&[Value]) -> anyhow::Result<ImageSource> + Send + Sync + 'static,
{
    callback_fn(move |args| {
        let image = f(args)?;
        let uri = image.to_uri(&options)?;
        Ok(Value::from(html::img(uri)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn rows(grid: &ImageArray) -> Vec<Vec<f32>> {
        let (r, c) = grid.shape();
        (0..r).map(|i| (0..c).map(|j| *grid.get(i, j)).collect()).collect()
    }

    fn decode(uri: &str) -> Vec<u8> {
        let b64 = uri.strip_prefix(PNG_URI_PREFIX).unwrap();
        STANDARD.decode(b64).unwrap()
    }

    #[test]
    fn test_reflect_pad_eye() {
        let padded = pad_to_shape(&ImageArray::eye(3), [Some(7), Some(7)], &PadMode::Reflect).unwrap();
        assert_eq!(
            rows(&padded),
            vec![
                vec![1., 0., 0., 0., 1., 0., 0.],
                vec![0., 1., 0., 1., 0., 1., 0.],
                vec![0., 0., 1., 0., 0., 0., 1.],
                vec![0., 1., 0., 1., 0., 1., 0.],
                vec![1., 0., 0., 0., 1., 0., 0.],
                vec![0., 1., 0., 1., 0., 1., 0.],
                vec![0., 0., 1., 0., 0., 0., 1.],
            ]
        );
    }

    #[test]
    fn test_pad_never_shrinks() {
        let eye = ImageArray::eye(3);
        assert_eq!(pad_to_shape(&eye, [Some(2), Some(2)], &PadMode::Reflect).unwrap(), eye);
        assert_eq!(pad_to_shape(&eye, [None, None], &PadMode::Reflect).unwrap(), eye);
    }

    #[test]
    fn test_constant_pad_mean() {
        let ones = ImageArray::filled(27, 29, 1.0);
        let padded = pad_to_shape(&ones, [Some(32), Some(32)], &PadMode::Constant(0.0)).unwrap();
        assert_eq!(padded.shape(), (32, 32));
        assert_eq!(padded.mean(), 0.7646484375);
        let row3: Vec<f32> = (0..32).map(|c| *padded.get(3, c)).collect();
        assert_eq!(row3[0], 0.0);
        assert!(row3[1..30].iter().all(|&v| v == 1.0));
        assert_eq!(&row3[30..], &[0.0, 0.0]);
    }

    #[test]
    fn test_force_shape_pads_then_centers() {
        let ones = ImageArray::filled(7, 9, 1.0);
        let out = force_shape(
            &ones,
            [Some(12), Some(12)],
            &PadMode::Constant(0.0),
            CropMode::Center,
            &mut rand::thread_rng(),
        )
        .unwrap();
        assert_eq!(out.shape(), (12, 12));
        assert_eq!(out.mean(), 0.4375);
        let row3: Vec<f32> = (0..12).map(|c| *out.get(3, c)).collect();
        assert_eq!(row3, vec![0., 1., 1., 1., 1., 1., 1., 1., 1., 1., 0., 0.]);
    }

    #[test]
    fn test_force_shape_center_crop() {
        let out = force_shape(
            &ImageArray::eye(3),
            [Some(2), Some(2)],
            &PadMode::Reflect,
            CropMode::Center,
            &mut rand::thread_rng(),
        )
        .unwrap();
        assert_eq!(rows(&out), vec![vec![1., 0.], vec![0., 1.]]);
    }

    #[test]
    fn test_force_shape_random_crop_is_a_window() {
        let eye = ImageArray::eye(3);
        let windows: Vec<Vec<Vec<f32>>> = vec![
            vec![vec![1., 0.], vec![0., 1.]],
            vec![vec![0., 0.], vec![1., 0.]],
            vec![vec![0., 1.], vec![0., 0.]],
        ];
        let mut rng = StdRng::seed_from_u64(2018);
        for _ in 0..20 {
            let out = force_shape(&eye, [Some(2), Some(2)], &PadMode::Reflect, CropMode::Random, &mut rng)
                .unwrap();
            assert!(windows.contains(&rows(&out)), "unexpected crop {:?}", rows(&out));
        }
    }

    #[test]
    fn test_force_shape_mixed_axes() {
        let ones = ImageArray::filled(2, 10, 1.0);
        let out = force_shape(
            &ones,
            [Some(4), Some(6)],
            &PadMode::Constant(0.0),
            CropMode::Center,
            &mut rand::thread_rng(),
        )
        .unwrap();
        assert_eq!(out.shape(), (4, 6));
        assert_eq!(out.mean(), 0.5);
    }

    #[test]
    fn test_empty_array_rejected() {
        let empty = ImageArray::zeros(0, 0);
        assert!(matches!(
            pad_to_shape(&empty, [Some(2), Some(2)], &PadMode::Reflect),
            Err(VizError::EmptyArray)
        ));
        assert!(matches!(
            array_to_uri(&empty, &ImageOptions::default()),
            Err(VizError::EmptyArray)
        ));
    }

    #[test]
    fn test_from_rows_shape_mismatch() {
        let err = Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, VizError::ShapeMismatch { expected: 4, got: 3, .. }));
    }

    #[test]
    fn test_colormap_endpoints() {
        assert_eq!(Colormap::Gray.rgba(0.0), [0, 0, 0, 255]);
        assert_eq!(Colormap::Gray.rgba(1.0), [255, 255, 255, 255]);
        assert_eq!(Colormap::RdBu.rgba(0.5), [0xf7, 0xf7, 0xf7, 255]);
        assert_eq!(Colormap::RdBu.rgba(-3.0), Colormap::RdBu.rgba(0.0));
        assert_eq!(Colormap::Viridis.rgba(f32::NAN), Colormap::Viridis.rgba(0.0));
    }

    #[test]
    fn test_colormap_parse() {
        assert_eq!("RdBu".parse::<Colormap>().unwrap(), Colormap::RdBu);
        assert_eq!("grey".parse::<Colormap>().unwrap(), Colormap::Gray);
        assert!(matches!("jet".parse::<Colormap>(), Err(VizError::UnknownColormap(_))));
    }

    #[test]
    fn test_array_to_uri_png_header() {
        let uri = array_to_uri(&ImageArray::zeros(100, 100), &ImageOptions::default()).unwrap();
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));

        let png = decode(&uri);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 128);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 128);
        assert_eq!(png[25], 6);
    }

    #[test]
    fn test_array_to_uri_rgb_and_size() {
        let options = ImageOptions {
            alpha: false,
            width: 64,
            height: 32,
            ..ImageOptions::default()
        };
        let png = decode(&array_to_uri(&ImageArray::eye(5), &options).unwrap());
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 64);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 32);
        assert_eq!(png[25], 2);
    }

    #[test]
    fn test_non_square_input_renders() {
        let wide = ImageArray::filled(5, 10, 2.0);
        let uri = array_to_uri(&wide, &ImageOptions::default()).unwrap();
        assert!(uri.starts_with(PNG_URI_PREFIX));
    }

    #[test]
    fn test_png_source_passthrough() {
        let source = ImageSource::Png(vec![1, 2, 3]);
        assert_eq!(
            source.to_uri(&ImageOptions::default()).unwrap(),
            "data:image/png;base64,AQID"
        );
    }

    #[test]
    fn test_image_handler_returns_img_component() {
        let handler = image_handler(ImageOptions::default(), |args| {
            let n = args[0].as_u64().unwrap_or(3) as usize;
            Ok(ImageArray::eye(n).into())
        });
        let out = handler(&[json!(4)]).unwrap();
        assert_eq!(out["type"], "Img");
        assert!(out["props"]["src"].as_str().unwrap().starts_with(PNG_URI_PREFIX));
    }

    #[test]
    fn test_image_options_from_toml() {
        let opts: ImageOptions = toml::from_str("colormap = \"viridis\"\nwidth = 64").unwrap();
        assert_eq!(opts.colormap, Colormap::Viridis);
        assert_eq!(opts.width, 64);
        assert_eq!(opts.height, 128);
        assert!(toml::from_str::<ImageOptions>("colormap = \"jet\"").is_err());
    }
}
