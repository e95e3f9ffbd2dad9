//! Hit-testing for the QTI shape vocabulary (`default`, `rect`, `circle`,
//! `poly`, `ellipse`), shared by the `inside` operator and area mappings.

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// The whole area; every point is inside.
    Default,
    Rect {
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    /// Vertices in order; a closing vertex equal to the first is allowed.
    Poly(Vec<(f64, f64)>),
    Ellipse {
        cx: f64,
        cy: f64,
        hr: f64,
        vr: f64,
    },
}

impl Shape {
    /// Build a shape from its name and comma-separated coordinate list.
    pub fn parse(shape: &str, coords: &str) -> Result<Shape, CoreError> {
        let nums = parse_coords(coords)?;
        let malformed = |expected: &str| CoreError::Deserialize {
            message: format!(
                "shape '{}' expects {}, got coords '{}'",
                shape, expected, coords
            ),
        };
        match shape {
            "default" => Ok(Shape::Default),
            "rect" => match nums.as_slice() {
                [x1, y1, x2, y2] => Ok(Shape::Rect {
                    left: x1.min(*x2),
                    top: y1.min(*y2),
                    right: x1.max(*x2),
                    bottom: y1.max(*y2),
                }),
                _ => Err(malformed("4 coordinates")),
            },
            "circle" => match nums.as_slice() {
                [cx, cy, r] => Ok(Shape::Circle {
                    cx: *cx,
                    cy: *cy,
                    r: *r,
                }),
                _ => Err(malformed("3 coordinates")),
            },
            "ellipse" => match nums.as_slice() {
                [cx, cy, hr, vr] => Ok(Shape::Ellipse {
                    cx: *cx,
                    cy: *cy,
                    hr: *hr,
                    vr: *vr,
                }),
                _ => Err(malformed("4 coordinates")),
            },
            "poly" => {
                if nums.len() < 6 || nums.len() % 2 != 0 {
                    return Err(malformed("at least 3 coordinate pairs"));
                }
                Ok(Shape::Poly(
                    nums.chunks_exact(2).map(|c| (c[0], c[1])).collect(),
                ))
            }
            other => Err(CoreError::Deserialize {
                message: format!("unknown shape '{}'", other),
            }),
        }
    }

    /// True when the point lies inside or on the edge of the shape.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            Shape::Default => true,
            Shape::Rect {
                left,
                top,
                right,
                bottom,
            } => x >= *left && x <= *right && y >= *top && y <= *bottom,
            Shape::Circle { cx, cy, r } => {
                let dx = x - cx;
                let dy = y - cy;
                dx * dx + dy * dy <= r * r
            }
            Shape::Ellipse { cx, cy, hr, vr } => {
                if *hr <= 0.0 || *vr <= 0.0 {
                    return false;
                }
                let dx = (x - cx) / hr;
                let dy = (y - cy) / vr;
                dx * dx + dy * dy <= 1.0
            }
            Shape::Poly(vertices) => point_in_polygon(vertices, x, y),
        }
    }
}

fn parse_coords(coords: &str) -> Result<Vec<f64>, CoreError> {
    coords
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| {
            c.parse::<f64>().map_err(|_| CoreError::Deserialize {
                message: format!("invalid shape coordinate '{}'", c),
            })
        })
        .collect()
}

/// Even-odd ray casting; points on an edge count as inside.
fn point_in_polygon(vertices: &[(f64, f64)], x: f64, y: f64) -> bool {
    let n = vertices.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if on_segment((xi, yi), (xj, yj), (x, y)) {
            return true;
        }
        if (yi > y) != (yj > y) {
            let cross_x = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    if cross.abs() > f64::EPSILON {
        return false;
    }
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}
