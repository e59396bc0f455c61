use glam::DVec2;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::{GeorefError, Result};
use crate::point::{GrPoint, ViewportKind};

/// Smallest world span a zoom may produce.
pub const DEFAULT_MIN_SPAN: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct ViewportState {
    pixel_dimension: DVec2,
    envelope: Option<Envelope>,
    // pixel width / height, None until the viewport has a size
    aspect_ratio: Option<f64>,
}

impl ViewportState {
    pub fn pixel_dimension(&self) -> DVec2 {
        self.pixel_dimension
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        self.aspect_ratio
    }

    pub fn is_initialized(&self) -> bool {
        self.envelope.is_some() && self.aspect_ratio.is_some()
    }

    fn set_pixel_dimension(&mut self, size: DVec2) {
        self.pixel_dimension = size;
        self.aspect_ratio = Some(size.x / size.y);
    }

    fn initialized(&self, kind: ViewportKind) -> Result<(&Envelope, DVec2)> {
        match (&self.envelope, self.aspect_ratio) {
            (Some(envelope), Some(_)) => Ok((envelope, self.pixel_dimension)),
            _ => Err(GeorefError::ViewportNotInitialized(kind)),
        }
    }

    /// Shrinks the relatively larger side so the envelope matches the pixel aspect ratio,
    /// keeping the (minX, maxY) corner in place.
    pub fn fix_aspect_ratio(&self, envelope: &Envelope) -> Result<Envelope> {
        let Some(pixel_ratio) = self.aspect_ratio else {
            return Ok(envelope.clone());
        };

        let span = envelope.span();
        let world_ratio = span.x / span.y;
        let (min, max) = (envelope.min(), envelope.max());

        if world_ratio > pixel_ratio {
            let width = span.y * pixel_ratio;
            envelope.with_bounds(min, DVec2::new(min.x + width, max.y))
        } else if world_ratio < pixel_ratio {
            let height = span.x / pixel_ratio;
            envelope.with_bounds(DVec2::new(min.x, max.y - height), max)
        } else {
            Ok(envelope.clone())
        }
    }
}

/// Pixel/world conversion and navigation for the footprint and georeferenced viewports.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    footprint: ViewportState,
    georeferenced: ViewportState,
    min_span: f64,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPAN)
    }
}

impl CoordinateMapper {
    pub fn new(min_span: f64) -> Self {
        Self {
            footprint: ViewportState::default(),
            georeferenced: ViewportState::default(),
            min_span: min_span.max(f64::MIN_POSITIVE),
        }
    }

    pub fn min_span(&self) -> f64 {
        self.min_span
    }

    pub fn set_min_span(&mut self, min_span: f64) {
        self.min_span = min_span.max(f64::MIN_POSITIVE);
    }

    pub fn state(&self, kind: ViewportKind) -> &ViewportState {
        match kind {
            ViewportKind::Footprint => &self.footprint,
            ViewportKind::Georeferenced => &self.georeferenced,
        }
    }

    fn state_mut(&mut self, kind: ViewportKind) -> &mut ViewportState {
        match kind {
            ViewportKind::Footprint => &mut self.footprint,
            ViewportKind::Georeferenced => &mut self.georeferenced,
        }
    }

    pub fn envelope(&self, kind: ViewportKind) -> Option<&Envelope> {
        self.state(kind).envelope()
    }

    pub fn is_initialized(&self, kind: ViewportKind) -> bool {
        self.state(kind).is_initialized()
    }

    pub fn pixel_to_world(&self, pixel: GrPoint) -> Result<GrPoint> {
        let (envelope, size) = self.state(pixel.kind).initialized(pixel.kind)?;
        let percent = pixel.pos / size;
        let span = envelope.span();

        Ok(pixel.with_pos(DVec2::new(
            envelope.min().x + percent.x * span.x,
            envelope.max().y - percent.y * span.y,
        )))
    }

    /// Inverse of [`Self::pixel_to_world`], rounded to whole pixels.
    pub fn world_to_pixel(&self, world: GrPoint) -> Result<GrPoint> {
        let (envelope, size) = self.state(world.kind).initialized(world.kind)?;
        let span = envelope.span();
        let percent = DVec2::new(
            (world.pos.x - envelope.min().x) / span.x,
            (envelope.max().y - world.pos.y) / span.y,
        );

        Ok(world.with_pos((percent * size).round()))
    }

    pub fn set_envelope(&mut self, kind: ViewportKind, envelope: Envelope) -> Result<()> {
        let state = self.state_mut(kind);
        let fixed = state.fix_aspect_ratio(&envelope)?;
        state.envelope = Some(fixed);
        Ok(())
    }

    pub fn set_pixel_dimension(&mut self, kind: ViewportKind, size: DVec2) -> Result<()> {
        if !size.is_finite() || size.x <= 0.0 || size.y <= 0.0 {
            return Err(GeorefError::input(format!(
                "viewport size must be positive, got {size}"
            )));
        }

        let state = self.state_mut(kind);
        state.set_pixel_dimension(size);
        if let Some(envelope) = state.envelope.take() {
            let fixed = state.fix_aspect_ratio(&envelope);
            // keep the old envelope if the corrected one is unusable
            state.envelope = Some(fixed.unwrap_or(envelope));
        }
        Ok(())
    }

    /// Re-applies aspect-ratio correction to the current envelope.
    pub fn fix_aspect_ratio(&mut self, kind: ViewportKind) -> Result<()> {
        let state = self.state_mut(kind);
        let (envelope, _) = state.initialized(kind)?;
        let fixed = state.fix_aspect_ratio(envelope)?;
        state.envelope = Some(fixed);
        Ok(())
    }

    /// Moves the envelope by `pixel_delta` (pressed minus released position).
    pub fn pan(&mut self, kind: ViewportKind, pixel_delta: DVec2) -> Result<()> {
        if !pixel_delta.is_finite() {
            return Err(GeorefError::input("pan delta is not finite"));
        }

        let state = self.state_mut(kind);
        let (envelope, size) = state.initialized(kind)?;
        let world_per_pixel = envelope.span() / size;
        let delta = DVec2::new(
            pixel_delta.x * world_per_pixel.x,
            -pixel_delta.y * world_per_pixel.y,
        );
        let moved = envelope.translated(delta);

        debug!(viewport = %kind, ?delta, "pan");
        state.envelope = Some(moved);
        Ok(())
    }

    /// Rescales the envelope so that `world_center` keeps its relative position.
    pub fn zoom(
        &mut self,
        kind: ViewportKind,
        zoom_in: bool,
        factor: f64,
        world_center: DVec2,
    ) -> Result<()> {
        if !(factor > 0.0 && factor < 1.0) {
            return Err(GeorefError::input(format!(
                "zoom factor must be between 0 and 1, got {factor}"
            )));
        }
        if !world_center.is_finite() {
            return Err(GeorefError::input("zoom center is not finite"));
        }

        let min_span = self.min_span;
        let state = self.state_mut(kind);
        let (envelope, _) = state.initialized(kind)?;

        let span = envelope.span();
        let scale = if zoom_in {
            1.0 - factor
        } else {
            1.0 / (1.0 - factor)
        };
        let scale = scale.max(min_span / span.min_element());
        let new_span = span * scale;

        let ratio = (world_center - envelope.min()) / span;
        let new_min = world_center - ratio * new_span;
        let zoomed = envelope.with_bounds(new_min, new_min + new_span)?;

        debug!(viewport = %kind, zoom_in, factor, span = ?new_span, "zoom");
        state.envelope = Some(zoomed);
        Ok(())
    }

    /// Zooms to the world box spanned by two pixel corners of a drag rectangle.
    pub fn zoom_to_rect(&mut self, kind: ViewportKind, a: DVec2, b: DVec2) -> Result<()> {
        let wa = self.pixel_to_world(GrPoint::new(kind, a))?;
        let wb = self.pixel_to_world(GrPoint::new(kind, b))?;

        let span = (wa.pos - wb.pos).abs();
        if span.min_element() < self.min_span {
            return Err(GeorefError::DegenerateEnvelope(format!(
                "zoom rectangle {a} .. {b} is too small"
            )));
        }

        let state = self.state_mut(kind);
        let (current, _) = state.initialized(kind)?;
        let rect = Envelope::from_points(wa.pos, wb.pos)?.with_crs(current.crs().cloned());
        let fixed = state.fix_aspect_ratio(&rect)?;

        debug!(viewport = %kind, min = ?fixed.min(), max = ?fixed.max(), "zoom to rect");
        state.envelope = Some(fixed);
        Ok(())
    }

    /// Re-centers the georeferenced viewport on `center`, optionally with a new span.
    pub fn center_on(
        &mut self,
        kind: ViewportKind,
        center: DVec2,
        span: Option<DVec2>,
    ) -> Result<()> {
        if kind == ViewportKind::Footprint {
            return Err(GeorefError::NotSupported(
                "centering the footprint viewport on a coordinate".to_string(),
            ));
        }

        let min_span = self.min_span;
        let state = self.state_mut(kind);
        let (current, _) = state.initialized(kind)?;
        let span = span.unwrap_or_else(|| current.span());
        if span.min_element() < min_span {
            return Err(GeorefError::input(format!("span {span} is too small")));
        }

        let centered = Envelope::from_center(center, span)?.with_crs(current.crs().cloned());
        let fixed = state.fix_aspect_ratio(&centered)?;
        state.envelope = Some(fixed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::FloatExt;

    fn mapper_with(kind: ViewportKind, size: DVec2, min: DVec2, max: DVec2) -> CoordinateMapper {
        let mut mapper = CoordinateMapper::default();
        mapper.set_pixel_dimension(kind, size).unwrap();
        mapper
            .set_envelope(kind, Envelope::new(min, max).unwrap())
            .unwrap();
        mapper
    }

    fn square() -> CoordinateMapper {
        mapper_with(
            ViewportKind::Georeferenced,
            DVec2::new(100.0, 100.0),
            DVec2::new(1000.0, 2000.0),
            DVec2::new(1100.0, 2100.0),
        )
    }

    fn assert_vec_eq(a: DVec2, b: DVec2) {
        assert!(
            a.x.approximately_eq(b.x) && a.y.approximately_eq(b.y),
            "{a} != {b}"
        );
    }

    #[test]
    fn pixel_to_world_inverts_y() {
        let mapper = square();
        let w = mapper
            .pixel_to_world(GrPoint::georeferenced(0.0, 0.0))
            .unwrap();
        assert_vec_eq(w.pos, DVec2::new(1000.0, 2100.0));

        let w = mapper
            .pixel_to_world(GrPoint::georeferenced(25.0, 100.0))
            .unwrap();
        assert_vec_eq(w.pos, DVec2::new(1025.0, 2000.0));
    }

    #[test]
    fn world_pixel_round_trip_within_a_pixel() {
        let mapper = mapper_with(
            ViewportKind::Georeferenced,
            DVec2::new(640.0, 480.0),
            DVec2::new(0.0, 0.0),
            DVec2::new(64.0, 48.0),
        );
        let world_per_pixel = 0.1;

        for p in [
            DVec2::new(0.0, 0.0),
            DVec2::new(12.34, 5.67),
            DVec2::new(63.99, 47.01),
            DVec2::new(32.05, 24.05),
        ] {
            let pixel = mapper
                .world_to_pixel(GrPoint::new(ViewportKind::Georeferenced, p))
                .unwrap();
            assert_eq!(pixel.pos, pixel.pos.round());
            let back = mapper.pixel_to_world(pixel).unwrap();
            assert!((back.pos - p).abs().max_element() <= world_per_pixel * 0.5 + 1e-9);
        }
    }

    #[test]
    fn uninitialized_viewport_fails_cleanly() {
        let mut mapper = CoordinateMapper::default();
        let err = mapper
            .pixel_to_world(GrPoint::footprint(1.0, 1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            GeorefError::ViewportNotInitialized(ViewportKind::Footprint)
        ));
        assert!(mapper.pan(ViewportKind::Footprint, DVec2::ONE).is_err());
        assert!(mapper.envelope(ViewportKind::Footprint).is_none());
    }

    #[test]
    fn pan_moves_against_drag_direction() {
        let mut mapper = square();
        // drag 10 px to the right and 20 px down: pressed - released = (-10, -20)
        mapper
            .pan(ViewportKind::Georeferenced, DVec2::new(-10.0, -20.0))
            .unwrap();
        let e = mapper.envelope(ViewportKind::Georeferenced).unwrap();
        assert_vec_eq(e.min(), DVec2::new(990.0, 2020.0));
        assert_vec_eq(e.max(), DVec2::new(1090.0, 2120.0));
    }

    #[test]
    fn zoom_keeps_cursor_point_fixed() {
        let mut mapper = square();
        let center = DVec2::new(1025.0, 2075.0);
        let before = mapper
            .world_to_pixel(GrPoint::new(ViewportKind::Georeferenced, center))
            .unwrap();

        mapper
            .zoom(ViewportKind::Georeferenced, true, 0.5, center)
            .unwrap();
        let e = mapper.envelope(ViewportKind::Georeferenced).unwrap();
        assert_vec_eq(e.span(), DVec2::new(50.0, 50.0));
        assert_vec_eq(e.min(), DVec2::new(1012.5, 2037.5));

        let after = mapper
            .world_to_pixel(GrPoint::new(ViewportKind::Georeferenced, center))
            .unwrap();
        assert_eq!(before.pos, after.pos);
    }

    #[test]
    fn zoom_in_then_out_restores_envelope() {
        let mut mapper = square();
        let original = mapper.envelope(ViewportKind::Georeferenced).unwrap().clone();
        let center = DVec2::new(1070.0, 2010.0);

        for factor in [0.1, 0.25, 0.9] {
            mapper
                .zoom(ViewportKind::Georeferenced, true, factor, center)
                .unwrap();
            mapper
                .zoom(ViewportKind::Georeferenced, false, factor, center)
                .unwrap();
            let e = mapper.envelope(ViewportKind::Georeferenced).unwrap();
            assert_vec_eq(e.min(), original.min());
            assert_vec_eq(e.max(), original.max());
        }
    }

    #[test]
    fn zoom_rejects_bad_factor_without_mutation() {
        let mut mapper = square();
        let original = mapper.envelope(ViewportKind::Georeferenced).unwrap().clone();
        for factor in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
            let err = mapper
                .zoom(ViewportKind::Georeferenced, true, factor, original.center())
                .unwrap_err();
            assert!(matches!(err, GeorefError::InputValidation(_)));
        }
        assert_eq!(mapper.envelope(ViewportKind::Georeferenced), Some(&original));
    }

    #[test]
    fn zoom_clamps_to_min_span() {
        let mut mapper = square();
        mapper.set_min_span(40.0);
        mapper
            .zoom(ViewportKind::Georeferenced, true, 0.9, DVec2::new(1050.0, 2050.0))
            .unwrap();
        let e = mapper.envelope(ViewportKind::Georeferenced).unwrap();
        assert_vec_eq(e.span(), DVec2::new(40.0, 40.0));
        assert_vec_eq(e.center(), DVec2::new(1050.0, 2050.0));
    }

    #[test]
    fn zoom_to_rect_fixes_aspect_ratio() {
        let mut mapper = square();
        // 40 px wide, 20 px high drag from top-left (10, 10)
        mapper
            .zoom_to_rect(
                ViewportKind::Georeferenced,
                DVec2::new(50.0, 30.0),
                DVec2::new(10.0, 10.0),
            )
            .unwrap();
        let e = mapper.envelope(ViewportKind::Georeferenced).unwrap();
        // anchored at (minX, maxY), width shrunk to the 20 unit height
        assert_vec_eq(e.min(), DVec2::new(1010.0, 2070.0));
        assert_vec_eq(e.max(), DVec2::new(1030.0, 2090.0));
    }

    #[test]
    fn degenerate_zoom_rect_is_rejected() {
        let mut mapper = square();
        let original = mapper.envelope(ViewportKind::Georeferenced).unwrap().clone();
        let err = mapper
            .zoom_to_rect(
                ViewportKind::Georeferenced,
                DVec2::new(10.0, 10.0),
                DVec2::new(10.0, 60.0),
            )
            .unwrap_err();
        assert!(matches!(err, GeorefError::DegenerateEnvelope(_)));
        assert_eq!(mapper.envelope(ViewportKind::Georeferenced), Some(&original));
    }

    #[test]
    fn resize_applies_partial_orientation() {
        let mut mapper = square();
        mapper
            .set_pixel_dimension(ViewportKind::Georeferenced, DVec2::new(200.0, 100.0))
            .unwrap();
        let state = mapper.state(ViewportKind::Georeferenced);
        assert_eq!(state.aspect_ratio(), Some(2.0));
        let e = state.envelope().unwrap();
        assert_vec_eq(e.min(), DVec2::new(1000.0, 2050.0));
        assert_vec_eq(e.max(), DVec2::new(1100.0, 2100.0));

        assert!(mapper
            .set_pixel_dimension(ViewportKind::Georeferenced, DVec2::new(0.0, 10.0))
            .is_err());
    }

    #[test]
    fn center_on_footprint_is_not_supported() {
        let mut mapper = mapper_with(
            ViewportKind::Footprint,
            DVec2::new(10.0, 10.0),
            DVec2::ZERO,
            DVec2::ONE,
        );
        let err = mapper
            .center_on(ViewportKind::Footprint, DVec2::ZERO, None)
            .unwrap_err();
        assert!(matches!(err, GeorefError::NotSupported(_)));
    }

    #[test]
    fn center_on_keeps_or_replaces_span() {
        let mut mapper = square();
        mapper
            .center_on(ViewportKind::Georeferenced, DVec2::new(0.0, 0.0), None)
            .unwrap();
        let e = mapper.envelope(ViewportKind::Georeferenced).unwrap();
        assert_vec_eq(e.min(), DVec2::new(-50.0, -50.0));

        mapper
            .center_on(
                ViewportKind::Georeferenced,
                DVec2::new(10.0, 10.0),
                Some(DVec2::new(4.0, 4.0)),
            )
            .unwrap();
        let e = mapper.envelope(ViewportKind::Georeferenced).unwrap();
        assert_vec_eq(e.min(), DVec2::new(8.0, 8.0));
        assert_vec_eq(e.max(), DVec2::new(12.0, 12.0));
    }
}
