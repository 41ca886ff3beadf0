//! Placement engine: position and rotation for every catalog element.
//!
//! Placement only writes absolute values, so running it twice gives the
//! same board.

use crate::board::{Board, Drawing, LayerId, RefId};
use crate::catalog::{catalog_range, Catalogs, Category, HOUR_SLOT_STRIDE};
use crate::config::ClockParams;
use crate::geometry::{
    degrees_from_ring_position, mm_to_nm, point_on_circle, GeometryError, Point,
};

/// Corners of the outline square in half board lengths, drawn in order.
const OUTLINE_CORNERS: [(f64, f64); 4] = [(-1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (1.0, -1.0)];

pub struct Placement<'p> {
    params: &'p ClockParams,
}

impl<'p> Placement<'p> {
    pub fn new(params: &'p ClockParams) -> Self {
        Self { params }
    }

    /// Place all five catalogs. Returns the number of placed elements.
    pub fn place_all(&self, board: &mut Board, catalogs: &Catalogs) -> Result<usize, GeometryError> {
        self.place_ring(board, &catalogs.seconds, Category::Seconds, self.params.seconds_radius())?;
        self.place_ring(board, &catalogs.hours, Category::Hours, self.params.hours_radius())?;
        self.place_digits(board, &catalogs.digits);
        let height = self.params.digit_height;
        self.place_fixed_offsets(board, &catalogs.separators, height * self.params.separator_offset);
        self.place_fixed_offsets(board, &catalogs.connectors, height * self.params.connector_offset);
        Ok(catalogs.len())
    }

    /// Put ring elements on the circle, facing outwards.
    pub fn place_ring(
        &self,
        board: &mut Board,
        indices: &[usize],
        category: Category,
        radius: f64,
    ) -> Result<(), GeometryError> {
        for &index in indices {
            let element = &mut board.elements[index];
            let Some(position) = element.id.as_ref().and_then(|id| ring_position(category, id))
            else {
                continue;
            };
            let rotation = ring_rotation(position);
            element.place(point_on_circle(radius, position)?, rotation);
            tracing::debug!(
                "Placed: {} {} at {} with rot {}",
                category,
                element.reference,
                element.position,
                rotation
            );
        }
        Ok(())
    }

    /// Lay the digits out left to right, symmetric about the origin.
    pub fn place_digits(&self, board: &mut Board, indices: &[usize]) {
        let slots = self.params.digit_slots();
        let range = catalog_range(Category::Digit);
        for &index in indices {
            let element = &mut board.elements[index];
            let Some(slot) = element
                .id
                .as_ref()
                .filter(|id| range.contains(id))
                .map(|id| range.slot(id) as usize)
            else {
                continue;
            };
            let Some(offset) = slots.get(slot) else {
                continue;
            };
            let rotation = self.params.digit_orientation.unwrap_or(element.rotation);
            element.place(Point::from_mm(offset * self.params.digit_width, 0.0), rotation);
            tracing::debug!("Placed: Digit {} at {}", element.reference, element.position);
        }
    }

    /// Place a pair on the vertical axis, first at `-unit`, second at `+unit`.
    pub fn place_fixed_offsets(&self, board: &mut Board, indices: &[usize], unit: f64) {
        for (slot, &index) in indices.iter().enumerate() {
            let sign = if slot == 0 { -1.0 } else { 1.0 };
            let element = &mut board.elements[index];
            element.place(Point::from_mm(0.0, sign * unit), self.params.fixed_orientation);
            tracing::debug!("Placed: {} at {}", element.reference, element.position);
        }
    }

    /// Four lines around the square board centred on the origin.
    pub fn outline(&self, layer: LayerId) -> Vec<Drawing> {
        let half = self.params.board_size / 2.0;
        let width = mm_to_nm(self.params.outline_width);
        (0..OUTLINE_CORNERS.len())
            .map(|i| {
                let (sx, sy) = OUTLINE_CORNERS[i];
                let (ex, ey) = OUTLINE_CORNERS[(i + 1) % OUTLINE_CORNERS.len()];
                Drawing {
                    uuid: String::new(),
                    start: Point::from_mm(sx * half, sy * half),
                    end: Point::from_mm(ex * half, ey * half),
                    width,
                    layer,
                }
            })
            .collect()
    }
}

/// Ring position of a ring element, `None` outside the ring catalogs.
pub fn ring_position(category: Category, id: &RefId) -> Option<f64> {
    let range = catalog_range(category);
    if !category.is_ring() || !range.contains(id) {
        return None;
    }
    let stride = match category {
        Category::Hours => HOUR_SLOT_STRIDE,
        _ => 1,
    };
    Some((range.slot(id) * stride) as f64)
}

/// Element rotation (tenths of a degree) at a ring position.
pub fn ring_rotation(position: f64) -> f64 {
    (degrees_from_ring_position(position) - 90.0) * 10.0
}
