//! Planar geometry helpers.
//!
//! All arithmetic is planar on (longitude, latitude) degrees. The only nod to
//! the sphere is [`shift_to_360`], which gives a second frame in which the
//! -180/180 meridian is not a discontinuity.

use geo::{Coord, Euclidean, Length, Line};

/// Shift a line from the -180..180 longitude frame to 0..360.
///
/// Each endpoint with a negative x-coordinate moves east by 360 degrees;
/// latitudes are untouched.
pub fn shift_to_360(line: &Line<f64>) -> Line<f64> {
    Line::new(shift_coord(line.start), shift_coord(line.end))
}

fn shift_coord(c: Coord<f64>) -> Coord<f64> {
    if c.x < 0.0 {
        Coord { x: c.x + 360.0, y: c.y }
    } else {
        c
    }
}

/// Euclidean length of a line in coordinate units.
pub fn planar_length(line: &Line<f64>) -> f64 {
    Euclidean.length(line)
}

/// Lengths of a line in the native frame and in the 0..360 frame.
pub fn dual_frame_lengths(line: &Line<f64>) -> (f64, f64) {
    (planar_length(line), planar_length(&shift_to_360(line)))
}

/// True when both endpoints share an x-coordinate.
pub fn is_vertical(line: &Line<f64>) -> bool {
    line.start.x == line.end.x
}

/// Project `point` onto the infinite line through `line`.
///
/// The line start is moved to the origin, the point is projected onto the
/// span of the moved end, and the result is moved back. Returns `None` for a
/// zero-length line, which spans nothing.
pub fn project_onto_line(point: Coord<f64>, line: &Line<f64>) -> Option<Coord<f64>> {
    let u = line.end - line.start;
    let uu = u.x * u.x + u.y * u.y;
    if uu == 0.0 {
        return None;
    }
    let v = point - line.start;
    let scale = (v.x * u.x + v.y * u.y) / uu;
    Some(Coord {
        x: u.x * scale + line.start.x,
        y: u.y * scale + line.start.y,
    })
}
