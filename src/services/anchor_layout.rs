use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

pub const DEFAULT_VIEWPORT: Size = Size {
    width: 1280.0,
    height: 800.0,
};

/// Geometry of the floating panel and the launcher button it sits above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorMetrics {
    pub panel: Size,
    pub launcher_size: f64,
    pub edge_margin: f64,
    pub launcher_gap: f64,
}

impl Default for AnchorMetrics {
    fn default() -> Self {
        Self {
            panel: Size::new(320.0, 420.0),
            launcher_size: 56.0,
            edge_margin: 24.0,
            launcher_gap: 16.0,
        }
    }
}

/// Compute the default panel position: bottom-right, stacked above the launcher.
///
/// Viewports too small for the panel pin it to the top/left margin instead.
pub fn default_panel_position(viewport: Size, metrics: &AnchorMetrics) -> Point {
    let margin = metrics.edge_margin.max(0.0);
    let panel = metrics.panel;

    let min_x = margin;
    let max_x = (viewport.width - margin - panel.width).max(min_x);
    let min_y = margin;
    let max_y = (viewport.height - margin - panel.height).max(min_y);

    let x = max_x;
    let y = (viewport.height - margin - metrics.launcher_size - metrics.launcher_gap - panel.height)
        .clamp(min_y, max_y);

    Point::new(x.round(), y.round())
}
