//! PNG rendering of a route over its road graph.
//!
//! The viewport is the route's bounding box padded by [`MARGIN_DEG`] on each
//! side. Longitudes are scaled by `cos(latitude)` at the viewport centre so
//! the picture is not stretched away from the equator.
//!
//! [`render_png_over_tile`] paints a stored map tile stretched across the
//! whole canvas before drawing roads and the route.

use std::fs;
use std::path::Path;

use geo::Coord;
use raqote::{
    BlendMode, DrawOptions, DrawTarget, Image, LineCap, LineJoin, PathBuilder, SolidSource,
    Source, StrokeStyle,
};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::{NodeId, RoadGraph};
use crate::routing::route_edges;

/// Padding around the route bounding box, in degrees.
pub const MARGIN_DEG: f64 = 0.01;

/// Colours and dimensions used by [`render_png_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    /// Pixel length of the longer image side.
    pub size_px: u32,
    pub background: SolidSource,
    pub road_color: SolidSource,
    pub road_width: f32,
    pub route_color: SolidSource,
    pub route_width: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            size_px: 1024,
            background: SolidSource::from_unpremultiplied_argb(0xff, 0x11, 0x11, 0x11),
            road_color: SolidSource::from_unpremultiplied_argb(0xff, 0x99, 0x99, 0x99),
            road_width: 1.0,
            // Red at 0.7 opacity.
            route_color: SolidSource::from_unpremultiplied_argb(0xb3, 0xff, 0x00, 0x00),
            route_width: 3.0,
        }
    }
}

/// Maps longitude/latitude onto image pixels.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    min_lon: f64,
    max_lat: f64,
    lon_scale: f64,
    px_per_deg: f64,
    width: i32,
    height: i32,
}

impl Viewport {
    fn fit<I>(coords: I, size_px: u32) -> Option<Self>
    where
        I: IntoIterator<Item = Coord<f64>>,
    {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for c in coords {
            bounds = Some(match bounds {
                None => (c.x, c.y, c.x, c.y),
                Some((x0, y0, x1, y1)) => (x0.min(c.x), y0.min(c.y), x1.max(c.x), y1.max(c.y)),
            });
        }
        let (min_lon, min_lat, max_lon, max_lat) = bounds?;
        let (min_lon, min_lat) = (min_lon - MARGIN_DEG, min_lat - MARGIN_DEG);
        let (max_lon, max_lat) = (max_lon + MARGIN_DEG, max_lat + MARGIN_DEG);

        let lon_scale = ((min_lat + max_lat) * 0.5).to_radians().cos().max(1e-6);
        let span_x = (max_lon - min_lon) * lon_scale;
        let span_y = max_lat - min_lat;
        let px_per_deg = f64::from(size_px.max(1)) / span_x.max(span_y);

        Some(Self {
            min_lon,
            max_lat,
            lon_scale,
            px_per_deg,
            width: ((span_x * px_per_deg).round() as i32).max(1),
            height: ((span_y * px_per_deg).round() as i32).max(1),
        })
    }

    fn project(&self, c: Coord<f64>) -> (f32, f32) {
        let x = (c.x - self.min_lon) * self.lon_scale * self.px_per_deg;
        let y = (self.max_lat - c.y) * self.px_per_deg;
        (x as f32, y as f32)
    }
}

/// Render the graph with the route highlighted, using [`RenderStyle::default`].
pub fn render_png(graph: &RoadGraph, route: &[NodeId]) -> Result<Vec<u8>> {
    render_png_with(graph, route, &RenderStyle::default())
}

/// Render the graph with the route highlighted and return PNG bytes.
///
/// Fails with [`Error::InvalidRoute`] when the route does not follow graph
/// edges.
pub fn render_png_with(graph: &RoadGraph, route: &[NodeId], style: &RenderStyle) -> Result<Vec<u8>> {
    render(graph, route, style, None)
}

/// Render the route over `tile_png`, a PNG map tile stretched to the canvas.
///
/// Fails with [`Error::Render`] when the tile cannot be decoded.
pub fn render_png_over_tile(graph: &RoadGraph, route: &[NodeId], tile_png: &[u8]) -> Result<Vec<u8>> {
    let tile = decode_tile(tile_png)?;
    render(graph, route, &RenderStyle::default(), Some(&tile))
}

fn render(
    graph: &RoadGraph,
    route: &[NodeId],
    style: &RenderStyle,
    tile: Option<&Tile>,
) -> Result<Vec<u8>> {
    let route_lines: Vec<Vec<Coord<f64>>> = route_edges(graph, route)?
        .into_iter()
        .map(|edge| edge.geometry.coords().copied().collect())
        .collect();

    let viewport = Viewport::fit(route_lines.iter().flatten().copied(), style.size_px)
        .ok_or_else(|| Error::invalid_route("route has no geometry"))?;
    debug!(
        width = viewport.width,
        height = viewport.height,
        edges = graph.edge_count(),
        tile = tile.is_some(),
        "rendering route"
    );

    let mut dt = DrawTarget::new(viewport.width, viewport.height);
    dt.clear(style.background);
    if let Some(tile) = tile {
        let image = Image {
            width: tile.width,
            height: tile.height,
            data: &tile.data,
        };
        let mut options = DrawOptions::new();
        options.blend_mode = BlendMode::SrcOver;
        dt.draw_image_with_size_at(
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            0.0,
            &image,
            &options,
        );
    }

    let road_source = Source::Solid(style.road_color);
    let road_stroke = stroke(style.road_width);
    for edge in graph.edges() {
        let coords: Vec<Coord<f64>> = edge.geometry.coords().copied().collect();
        draw_line(&mut dt, &viewport, &coords, &road_source, &road_stroke);
    }

    let route_source = Source::Solid(style.route_color);
    let route_stroke = stroke(style.route_width);
    let route_coords: Vec<Coord<f64>> = route_lines.into_iter().flatten().collect();
    draw_line(&mut dt, &viewport, &route_coords, &route_source, &route_stroke);

    encode_png(&dt)
}

/// Decoded map tile as premultiplied ARGB pixels.
struct Tile {
    width: i32,
    height: i32,
    data: Vec<u32>,
}

fn decode_tile(bytes: &[u8]) -> Result<Tile> {
    let tile_error = |e: png::DecodingError| Error::Render {
        message: format!("cannot decode map tile: {e}"),
    };
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(tile_error)?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(tile_error)?;
    let pixels = &buf[..info.buffer_size()];

    let premultiply = |r: u8, g: u8, b: u8, a: u8| -> u32 {
        let a = u32::from(a);
        let scale = |c: u8| (u32::from(c) * a + 127) / 255;
        (a << 24) | (scale(r) << 16) | (scale(g) << 8) | scale(b)
    };
    let data: Vec<u32> = match info.color_type {
        png::ColorType::Rgba => pixels
            .chunks_exact(4)
            .map(|p| premultiply(p[0], p[1], p[2], p[3]))
            .collect(),
        png::ColorType::Rgb => pixels
            .chunks_exact(3)
            .map(|p| premultiply(p[0], p[1], p[2], 0xff))
            .collect(),
        png::ColorType::GrayscaleAlpha => pixels
            .chunks_exact(2)
            .map(|p| premultiply(p[0], p[0], p[0], p[1]))
            .collect(),
        png::ColorType::Grayscale => pixels
            .iter()
            .map(|&v| premultiply(v, v, v, 0xff))
            .collect(),
        png::ColorType::Indexed => {
            return Err(Error::Render {
                message: "cannot decode map tile: palette was not expanded".to_string(),
            })
        }
    };

    let dimension = |v: u32| {
        i32::try_from(v).map_err(|_| Error::Render {
            message: format!("map tile dimension {v} is too large"),
        })
    };
    Ok(Tile {
        width: dimension(info.width)?,
        height: dimension(info.height)?,
        data,
    })
}

/// Render the route and write the PNG to `path`.
pub fn save_png(graph: &RoadGraph, route: &[NodeId], path: &Path) -> Result<()> {
    write_png(path, &render_png(graph, route)?)
}

/// Render the route over a map tile and write the PNG to `path`.
pub fn save_png_over_tile(
    graph: &RoadGraph,
    route: &[NodeId],
    tile_png: &[u8],
    path: &Path,
) -> Result<()> {
    write_png(path, &render_png_over_tile(graph, route, tile_png)?)
}

fn write_png(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|source| Error::Output {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "route visualization saved");
    Ok(())
}

fn stroke(width: f32) -> StrokeStyle {
    StrokeStyle {
        width,
        cap: LineCap::Round,
        join: LineJoin::Round,
        ..StrokeStyle::default()
    }
}

fn draw_line(
    dt: &mut DrawTarget,
    viewport: &Viewport,
    coords: &[Coord<f64>],
    source: &Source,
    style: &StrokeStyle,
) {
    let Some((first, rest)) = coords.split_first() else {
        return;
    };
    let mut pb = PathBuilder::new();
    let (x0, y0) = viewport.project(*first);
    pb.move_to(x0, y0);
    for coord in rest {
        let (x, y) = viewport.project(*coord);
        pb.line_to(x, y);
    }
    dt.stroke(&pb.finish(), source, style, &DrawOptions::new());
}

/// Encode the premultiplied ARGB draw target as an 8-bit RGBA PNG.
fn encode_png(dt: &DrawTarget) -> Result<Vec<u8>> {
    let mut rgba = Vec::with_capacity(dt.get_data().len() * 4);
    for pixel in dt.get_data() {
        let a = (pixel >> 24) & 0xff;
        let unpremultiply = |channel: u32| -> u8 {
            if a == 0 {
                0
            } else {
                ((channel * 255 + a / 2) / a).min(255) as u8
            }
        };
        rgba.push(unpremultiply((pixel >> 16) & 0xff));
        rgba.push(unpremultiply((pixel >> 8) & 0xff));
        rgba.push(unpremultiply(pixel & 0xff));
        rgba.push(a as u8);
    }

    let render_error = |e: png::EncodingError| Error::Render {
        message: e.to_string(),
    };
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, dt.width() as u32, dt.height() as u32);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(render_error)?;
        writer.write_image_data(&rgba).map_err(render_error)?;
        writer.finish().map_err(render_error)?;
    }
    Ok(bytes)
}
