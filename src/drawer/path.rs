//! Path data for lines, areas and arcs.

use std::f64::consts::{PI, TAU};
use std::fmt::Write as _;

use crate::geom::Point;
use crate::svg::format_number;

fn push_point(out: &mut String, command: char, point: Point) {
    let _ = write!(
        out,
        "{command}{},{}",
        format_number(point.x),
        format_number(point.y)
    );
}

/// Split points into runs of defined points.
fn segments<T: Copy>(points: &[Option<T>]) -> Vec<Vec<T>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for point in points {
        match point {
            Some(point) => current.push(*point),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Polyline through the points. Undefined points break the stroke.
pub fn line_path(points: &[Option<Point>]) -> String {
    let mut out = String::new();
    for run in segments(points) {
        for (index, point) in run.iter().enumerate() {
            push_point(&mut out, if index == 0 { 'M' } else { 'L' }, *point);
        }
    }
    out
}

/// Closed area between each top point and its baseline `y0`.
///
/// Undefined points split the area into separate closed shapes.
pub fn area_path(points: &[Option<(Point, f64)>]) -> String {
    let mut out = String::new();
    for run in segments(points) {
        for (index, (top, _)) in run.iter().enumerate() {
            push_point(&mut out, if index == 0 { 'M' } else { 'L' }, *top);
        }
        for (top, y0) in run.iter().rev() {
            push_point(&mut out, 'L', Point::new(top.x, *y0));
        }
        out.push('Z');
    }
    out
}

/// Point at `radius` and `angle`, angles running clockwise from twelve o'clock.
pub fn polar(radius: f64, angle: f64) -> Point {
    Point::new(radius * angle.sin(), -radius * angle.cos())
}

fn push_arc(out: &mut String, radius: f64, large: bool, sweep: bool, to: Point) {
    let r = format_number(radius);
    let _ = write!(
        out,
        "A{r},{r} 0 {},{} {},{}",
        u8::from(large),
        u8::from(sweep),
        format_number(to.x),
        format_number(to.y)
    );
}

/// Annular sector between two radii and two angles, centred on the origin.
pub fn arc_path(inner_radius: f64, outer_radius: f64, start_angle: f64, end_angle: f64) -> String {
    let r0 = inner_radius.max(0.0);
    let r1 = outer_radius.max(r0);
    let (a0, a1) = if end_angle < start_angle {
        (end_angle, start_angle)
    } else {
        (start_angle, end_angle)
    };
    let sweep_angle = a1 - a0;
    let mut out = String::new();
    if r1 <= 0.0 || sweep_angle <= 0.0 {
        return out;
    }
    if sweep_angle >= TAU - 1e-9 {
        push_point(&mut out, 'M', Point::new(0.0, -r1));
        push_arc(&mut out, r1, true, true, Point::new(0.0, r1));
        push_arc(&mut out, r1, true, true, Point::new(0.0, -r1));
        if r0 > 0.0 {
            push_point(&mut out, 'M', Point::new(0.0, -r0));
            push_arc(&mut out, r0, true, false, Point::new(0.0, r0));
            push_arc(&mut out, r0, true, false, Point::new(0.0, -r0));
        }
        out.push('Z');
        return out;
    }
    let large = sweep_angle > PI;
    push_point(&mut out, 'M', polar(r1, a0));
    push_arc(&mut out, r1, large, true, polar(r1, a1));
    if r0 > 0.0 {
        push_point(&mut out, 'L', polar(r0, a1));
        push_arc(&mut out, r0, large, false, polar(r0, a0));
    } else {
        push_point(&mut out, 'L', Point::default());
    }
    out.push('Z');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_split_the_line() {
        let points = [
            Some(Point::new(0.0, 0.0)),
            Some(Point::new(1.0, 2.0)),
            None,
            Some(Point::new(3.0, 1.0)),
        ];
        assert_eq!(line_path(&points), "M0,0L1,2M3,1");
        assert_eq!(line_path(&[None, None]), "");
    }

    #[test]
    fn area_closes_along_baseline() {
        let points = [Some((Point::new(0.0, 1.0), 5.0)), Some((Point::new(2.0, 3.0), 5.0))];
        assert_eq!(area_path(&points), "M0,1L2,3L2,5L0,5Z");
    }

    #[test]
    fn quarter_pie_slice() {
        assert_eq!(arc_path(0.0, 10.0, 0.0, PI / 2.0), "M0,-10A10,10 0 0,1 10,0L0,0Z");
        let donut = arc_path(5.0, 10.0, 0.0, PI / 2.0);
        assert_eq!(donut, "M0,-10A10,10 0 0,1 10,0L5,0A5,5 0 0,0 0,-5Z");
        assert!(arc_path(0.0, 10.0, 0.0, TAU).starts_with("M0,-10A10,10 0 1,1 0,10"));
        assert_eq!(arc_path(0.0, 10.0, 1.0, 1.0), "");
    }
}
