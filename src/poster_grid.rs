use futures::future::join_all;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::{debug, error};

pub const GRID_COLUMNS: u32 = 2;
const PLACEHOLDER: Rgb<u8> = Rgb([50, 50, 50]);
const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
pub const GRID_FILENAME: &str = "poster_grid.png";

/// Cell size of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub cell_width: u32,
    pub cell_height: u32,
}

impl GridLayout {
    /// Poster size, scaled down so two columns fit `max_width`
    pub fn new(poster_width: u32, poster_height: u32, max_width: u32) -> Self {
        let poster_width = poster_width.max(1);
        let poster_height = poster_height.max(1);
        let fit = (max_width / GRID_COLUMNS).max(1);
        if poster_width <= fit {
            return Self {
                cell_width: poster_width,
                cell_height: poster_height,
            };
        }
        let scaled_height = (u64::from(poster_height) * u64::from(fit) / u64::from(poster_width)).max(1);
        Self {
            cell_width: fit,
            cell_height: u32::try_from(scaled_height).unwrap_or(u32::MAX),
        }
    }
}

/// Lay posters out left to right, two per row. Missing posters become grey tiles.
pub fn compose_grid(posters: &[Option<DynamicImage>], layout: GridLayout) -> RgbImage {
    let count = u32::try_from(posters.len()).unwrap_or(u32::MAX).max(1);
    let rows = count.div_ceil(GRID_COLUMNS);
    let mut grid = RgbImage::from_pixel(
        GRID_COLUMNS * layout.cell_width,
        rows * layout.cell_height,
        BACKGROUND,
    );
    let placeholder = RgbImage::from_pixel(layout.cell_width, layout.cell_height, PLACEHOLDER);

    for (idx, poster) in posters.iter().enumerate() {
        let idx = idx as u32;
        let x = (idx % GRID_COLUMNS) * layout.cell_width;
        let y = (idx / GRID_COLUMNS) * layout.cell_height;
        match poster {
            Some(img) => {
                let tile = img
                    .resize_exact(layout.cell_width, layout.cell_height, FilterType::Lanczos3)
                    .to_rgb8();
                imageops::replace(&mut grid, &tile, i64::from(x), i64::from(y));
            }
            None => imageops::replace(&mut grid, &placeholder, i64::from(x), i64::from(y)),
        }
    }
    grid
}

pub fn encode_png(grid: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    grid.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

async fn fetch_poster(client: &reqwest::Client, url: &str) -> Option<DynamicImage> {
    let resp = match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            error!("Poster {} returned status {}", url, resp.status());
            return None;
        }
        Err(e) => {
            error!("Error fetching poster from {}: {}", url, e);
            return None;
        }
    };
    let bytes = resp.bytes().await.ok()?;
    match image::load_from_memory(&bytes) {
        Ok(img) => Some(img),
        Err(e) => {
            error!("Could not decode poster {}: {}", url, e);
            None
        }
    }
}

/// Download all posters concurrently; failures yield `None`
pub async fn fetch_posters(client: &reqwest::Client, urls: &[Option<String>]) -> Vec<Option<DynamicImage>> {
    debug!("Fetching {} posters", urls.len());
    join_all(urls.iter().map(|url| async move {
        match url {
            Some(url) => fetch_poster(client, url).await,
            None => None,
        }
    }))
    .await
}
