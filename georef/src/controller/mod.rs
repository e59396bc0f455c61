//! Mediates user input against the coordinate mapper, the correspondence store and the
//! transformation solvers.
//!
//! All state lives in [`Controller`] and is mutated synchronously from [`Controller::handle`].
//! Errors never leave `handle`: they are logged and reported through the view.

mod event;
mod state;


use std::path::Path;

use glam::DVec2;
use tracing::{debug, info, warn};

use crate::envelope::Envelope;
use crate::error::{GeorefError, Result};
use crate::footprint::{save_buildings, Building, Footprint, Ring};
use crate::jump::{parse_decimal, CoordinateJump};
use crate::mapper::CoordinateMapper;
use crate::options::{GeorefOptions, OptionsModel};
use crate::point::{GrPoint, Point4Values, ViewportKind};
use crate::point_table::PointTableFile;
use crate::scene::{Scene, SceneImage, SceneProvider, WmsLayerRequest};
use crate::store::{CorrespondenceStore, TableColumn};
use crate::transform::{
    create_method, FittedTransform, SolverInput, TransformationResult, TransformationType,
};
use crate::view::{GeorefView, TableRow};

pub use event::InteractionEvent;
pub use state::{NavigationMode, PerViewport};

use state::DragState;

const VIEWPORTS: [ViewportKind; 2] = [ViewportKind::Footprint, ViewportKind::Georeferenced];

/// Everything the controller is wired to at construction.
pub struct ControllerContext<V, P> {
    pub view: V,
    pub provider: P,
    pub options: GeorefOptions,
}

pub struct Controller<V: GeorefView, P: SceneProvider> {
    view: V,
    provider: P,
    options: OptionsModel,
    mapper: CoordinateMapper,
    store: CorrespondenceStore,
    buildings: Vec<Building>,
    footprint: Footprint,
    // raster shown in the georeferenced viewport
    scene: Option<Box<dyn Scene>>,
    modes: PerViewport<NavigationMode>,
    pending: PerViewport<Option<Point4Values>>,
    last_moved: PerViewport<Option<DVec2>>,
    drag: Option<DragState>,
    last_result: Option<TransformationResult>,
    // set by an explicit compute only
    computed: Option<FittedTransform>,
}

impl<V: GeorefView, P: SceneProvider> Controller<V, P> {
    pub fn new(context: ControllerContext<V, P>) -> Self {
        let ControllerContext {
            view,
            provider,
            options,
        } = context;

        Self {
            view,
            provider,
            mapper: CoordinateMapper::new(options.min_span),
            options: OptionsModel::new(options),
            store: CorrespondenceStore::new(),
            buildings: Vec::new(),
            footprint: Footprint::default(),
            scene: None,
            modes: PerViewport::default(),
            pending: PerViewport::default(),
            last_moved: PerViewport::default(),
            drag: None,
            last_result: None,
            computed: None,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn store(&self) -> &CorrespondenceStore {
        &self.store
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn options(&self) -> &OptionsModel {
        &self.options
    }

    pub fn mode(&self, kind: ViewportKind) -> NavigationMode {
        *self.modes.get(kind)
    }

    pub fn pending(&self, kind: ViewportKind) -> Option<&Point4Values> {
        self.pending.get(kind).as_ref()
    }

    /// Viewport holding the pick that waits for its counterpart.
    pub fn focus(&self) -> Option<ViewportKind> {
        VIEWPORTS
            .into_iter()
            .find(|&kind| self.pending.get(kind).is_some())
    }

    pub fn last_result(&self) -> Option<&TransformationResult> {
        self.last_result.as_ref()
    }

    pub fn computed(&self) -> Option<&FittedTransform> {
        self.computed.as_ref()
    }

    pub fn handle(&mut self, event: InteractionEvent) {
        if let Err(err) = self.try_handle(event) {
            warn!(%err, "interaction failed");
            self.view.report_error(&err.to_string());
        }
    }

    pub fn try_handle(&mut self, event: InteractionEvent) -> Result<()> {
        match event {
            InteractionEvent::DragStarted {
                viewport,
                pixel,
                ctrl,
            } => {
                self.drag_started(viewport, pixel, ctrl);
                Ok(())
            }
            InteractionEvent::Dragged { viewport, pixel } => {
                self.dragged(viewport, pixel);
                Ok(())
            }
            InteractionEvent::DragEnded { viewport, pixel } => self.drag_ended(viewport, pixel),
            InteractionEvent::PointPicked { viewport, pixel } => self.pick(viewport, pixel),
            InteractionEvent::PointerMoved { viewport, pixel } => {
                *self.last_moved.get_mut(viewport) = Some(pixel);
                Ok(())
            }
            InteractionEvent::WheelScrolled { viewport, rotation } => {
                self.wheel(viewport, rotation)
            }
            InteractionEvent::Resized { viewport, size } => self.resized(viewport, size),
            InteractionEvent::ResetView { viewport } => self.reset_view(viewport),
            InteractionEvent::ModeToggled { viewport, mode } => {
                self.toggle_mode(viewport, mode);
                Ok(())
            }
            InteractionEvent::CoordinateJumpEntered {
                viewport,
                x,
                y,
                span,
            } => self.coordinate_jump(viewport, &x, &y, &span),
            InteractionEvent::CoordinateJumpCancelled { viewport } => {
                if self.mode(viewport) == NavigationMode::CoordinateJump {
                    *self.modes.get_mut(viewport) = NavigationMode::Idle;
                }
                Ok(())
            }
            InteractionEvent::CellEdited { row, column, value } => {
                self.cell_edited(row, column, &value)
            }
            InteractionEvent::DeleteRows { rows } => self.delete_rows(&rows),
            InteractionEvent::DeleteAll => self.delete_all(),
            InteractionEvent::Compute => self.compute(),
            InteractionEvent::SetTransformationType(kind) => self.set_transformation_type(kind),
            InteractionEvent::SetPolynomialOrder(order) => {
                self.options.set_polynomial_order(order)?;
                self.update_residuals_quietly();
                self.refresh_table();
                self.refresh_panel(ViewportKind::Georeferenced)
            }
            InteractionEvent::ZoomFactorEdited(text) => self.options.set_zoom_factor_text(&text),
            InteractionEvent::PointSizeEdited(text) => self.options.set_point_size_text(&text),
            InteractionEvent::SnappingToggled(snapping) => {
                self.options.set_snapping(snapping);
                Ok(())
            }
            InteractionEvent::OptionsCommitted => {
                let point_size = self.options.commit().point_size;
                for kind in VIEWPORTS {
                    let panel = self.view.panel(kind);
                    panel.set_point_size(point_size);
                    panel.repaint();
                }
                Ok(())
            }
            InteractionEvent::OptionsCancelled => {
                self.options.cancel();
                Ok(())
            }
            InteractionEvent::OpenWmsLayer(request) => self.open_wms_layer(&request),
            InteractionEvent::OpenShapefile(path) => self.open_shapefile(&path),
            InteractionEvent::OpenBuildings(path) => self.open_buildings(&path),
            InteractionEvent::SaveBuildings(path) => self.save_buildings(&path),
            InteractionEvent::SavePointTable(path) => self.save_point_table(&path),
            InteractionEvent::LoadPointTable(path) => self.load_point_table(&path),
        }
    }

    fn viewport_ready(&self, kind: ViewportKind) -> bool {
        let ready = self.mapper.is_initialized(kind);
        if !ready {
            debug!(viewport = %kind, "ignoring pointer event, viewport has no envelope");
        }
        ready
    }

    // Point picking

    fn pick(&mut self, kind: ViewportKind, pixel: DVec2) -> Result<()> {
        if !self.viewport_ready(kind) {
            return Ok(());
        }
        if self.mode(kind) != NavigationMode::Idle {
            debug!(viewport = %kind, mode = %self.mode(kind), "click handled by navigation");
            return Ok(());
        }

        let (pixel, world) = self.resolve_pick(kind, pixel)?;

        if self.pending.get(kind.other()).is_some() {
            let rc = self.view.table().set_coords(world);
            *self.pending.get_mut(kind) = Some(Point4Values::new(pixel, world, rc));
            self.commit_pending_pair()?;
            self.update_residuals_quietly();
            self.refresh_table();
            return self.refresh_all();
        }

        if self.pending.get(kind).is_none() {
            self.view.table().add_row();
        }
        let rc = self.view.table().set_coords(world);
        let point = Point4Values::new(pixel, world, rc);
        *self.pending.get_mut(kind) = Some(point);
        debug!(viewport = %kind, row = rc.row, world = ?world.pos, "point picked");

        let panel = self.view.panel(kind);
        panel.set_last_point(Some(point));
        panel.set_focus(true);
        panel.repaint();
        Ok(())
    }

    /// Pixel and world position of a click, snapped to the footprint if enabled.
    fn resolve_pick(&self, kind: ViewportKind, pixel: DVec2) -> Result<(GrPoint, GrPoint)> {
        let pixel = GrPoint::new(kind, pixel);
        let world = self.mapper.pixel_to_world(pixel)?;

        if kind == ViewportKind::Footprint && self.options.committed().snapping {
            if let Some(vertex) = self.footprint.closest_vertex(world.pos) {
                let world = world.with_pos(vertex);
                return Ok((self.mapper.world_to_pixel(world)?, world));
            }
        }
        Ok((pixel, world))
    }

    /// Moves a complete pending pair into the store.
    fn commit_pending_pair(&mut self) -> Result<bool> {
        let (Some(footprint), Some(georeferenced)) =
            (self.pending.footprint, self.pending.georeferenced)
        else {
            return Ok(false);
        };

        let row = self.store.add(footprint, georeferenced)?;
        self.clear_pending();
        info!(row, total = self.store.len(), "correspondence committed");
        Ok(true)
    }

    fn clear_pending(&mut self) {
        self.pending = PerViewport::default();
        for kind in VIEWPORTS {
            let panel = self.view.panel(kind);
            panel.set_last_point(None);
            panel.set_focus(false);
        }
    }

    fn cell_edited(&mut self, row: usize, column: usize, value: &str) -> Result<()> {
        let column = TableColumn::from_index(column)?;
        let value = parse_decimal(value, &column.to_string())?;

        if row == self.store.len() {
            return self.edit_pending(row, column, value);
        }

        if self.store.update_cell(row, column, value, &self.mapper)? {
            self.update_residuals_quietly();
            self.refresh_table();
            self.refresh_all()?;
        }
        Ok(())
    }

    /// Edits of the not yet committed row go to the pending pick.
    fn edit_pending(&mut self, row: usize, column: TableColumn, value: f64) -> Result<()> {
        let kind = column
            .viewport()
            .ok_or_else(|| GeorefError::input(format!("column {column} is read only")))?;
        let point = self
            .pending
            .get_mut(kind)
            .as_mut()
            .ok_or(GeorefError::RowNotFound(row))?;

        let world = GrPoint::new(kind, column.apply(point.world_coords.pos, value)?);
        if world == point.world_coords {
            return Ok(());
        }
        let pixel = self
            .mapper
            .world_to_pixel(world)
            .unwrap_or(point.new_value);
        point.relocate(pixel, world);
        let point = *point;

        let panel = self.view.panel(kind);
        panel.set_last_point(Some(point));
        panel.repaint();
        Ok(())
    }

    fn has_pending(&self) -> bool {
        self.focus().is_some()
    }

    /// The pending pick is displayed as the row after the last stored one. Selecting it
    /// drops the pick.
    fn delete_rows(&mut self, rows: &[usize]) -> Result<()> {
        let pending_row = self.store.len();
        let has_pending = self.has_pending();
        let (pending, stored): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&row| has_pending && row == pending_row);

        self.store.remove_rows(&stored)?;
        info!(rows = ?stored, remaining = self.store.len(), "rows deleted");

        if pending.is_empty() {
            let row = self.store.len();
            for kind in VIEWPORTS {
                if let Some(point) = self.pending.get_mut(kind) {
                    point.set_row(row);
                    let point = *point;
                    self.view.panel(kind).set_last_point(Some(point));
                }
            }
        } else {
            debug!(row = pending_row, "pending pick deleted");
            self.clear_pending();
        }

        self.update_residuals_quietly();
        self.refresh_table();
        self.refresh_all()
    }

    fn delete_all(&mut self) -> Result<()> {
        self.store.remove_all();
        self.clear_pending();
        self.last_result = None;
        self.computed = None;
        self.view.table().remove_all_rows();
        self.reset_navigation();
        info!("all correspondences deleted");
        self.refresh_all()
    }

    // Solving

    fn solve(&self) -> Result<TransformationResult> {
        let options = self.options.committed();
        let method = create_method(
            options.transformation_type,
            options.polynomial_order,
            SolverInput::new(&self.store, &self.footprint),
        )?;
        method.solve()
    }

    fn apply_result(&mut self, result: TransformationResult) -> Result<()> {
        self.store.set_residuals(&result.residuals)?;
        self.last_result = Some(result);
        Ok(())
    }

    /// Refits after an edit. Too few points is the normal state while collecting, so failures
    /// only clear the residuals.
    fn update_residuals_quietly(&mut self) {
        let outcome = self.solve().and_then(|result| self.apply_result(result));
        if let Err(err) = outcome {
            self.store.clear_residuals();
            self.last_result = None;
            if err.is_underdetermined() {
                debug!(%err, "residuals not available yet");
            } else {
                warn!(%err, "residual update failed");
            }
        }
    }

    fn compute(&mut self) -> Result<()> {
        self.commit_pending_pair()?;

        let result = self.solve()?;
        info!(
            kind = %result.transform.kind(),
            points = self.store.len(),
            rmse = result.rmse,
            "transformation computed"
        );
        self.computed = Some(result.transform.clone());
        self.apply_result(result)?;

        self.refresh_table();
        self.refresh_all()?;
        self.reset_navigation();
        Ok(())
    }

    fn set_transformation_type(&mut self, kind: TransformationType) -> Result<()> {
        self.options.set_transformation_type(kind);
        self.update_residuals_quietly();
        self.refresh_table();
        self.refresh_panel(ViewportKind::Georeferenced)
    }

    // Navigation

    fn toggle_mode(&mut self, kind: ViewportKind, mode: NavigationMode) {
        let mode = self.mode(kind).toggled(mode);
        *self.modes.get_mut(kind) = mode;
        debug!(viewport = %kind, %mode, "navigation mode");

        let panel = self.view.panel(kind);
        panel.set_zoom_rect(None);
        panel.repaint();
    }

    fn reset_navigation(&mut self) {
        self.modes = PerViewport::default();
        self.drag = None;
        for kind in VIEWPORTS {
            let panel = self.view.panel(kind);
            panel.set_zoom_rect(None);
            panel.set_focus(false);
        }
    }

    fn drag_started(&mut self, kind: ViewportKind, pixel: DVec2, ctrl: bool) {
        if !self.viewport_ready(kind) {
            return;
        }
        self.drag = Some(DragState {
            viewport: kind,
            pressed: pixel,
            ctrl,
        });
    }

    fn dragged(&mut self, kind: ViewportKind, pixel: DVec2) {
        let Some(drag) = self.drag.filter(|d| d.viewport == kind) else {
            return;
        };
        if matches!(
            drag.effective_mode(self.mode(kind)),
            NavigationMode::ZoomIn | NavigationMode::ZoomOut
        ) {
            let panel = self.view.panel(kind);
            panel.set_zoom_rect(Some((drag.pressed, pixel)));
            panel.repaint();
        }
    }

    fn drag_ended(&mut self, kind: ViewportKind, pixel: DVec2) -> Result<()> {
        let Some(drag) = self.drag.take().filter(|d| d.viewport == kind) else {
            return Ok(());
        };
        if !self.viewport_ready(kind) {
            return Ok(());
        }

        self.view.panel(kind).set_zoom_rect(None);
        let factor = self.options.committed().zoom_factor;

        match drag.effective_mode(self.mode(kind)) {
            NavigationMode::Panning => {
                let delta = drag.pressed - pixel;
                if delta == DVec2::ZERO {
                    return Ok(());
                }
                self.mapper.pan(kind, delta)?;
            }
            NavigationMode::ZoomIn if drag.pressed == pixel => {
                let center = self.mapper.pixel_to_world(GrPoint::new(kind, pixel))?;
                self.mapper.zoom(kind, true, factor, center.pos)?;
            }
            NavigationMode::ZoomIn => self.mapper.zoom_to_rect(kind, drag.pressed, pixel)?,
            NavigationMode::ZoomOut => {
                let center = self.mapper.pixel_to_world(GrPoint::new(kind, pixel))?;
                self.mapper.zoom(kind, false, factor, center.pos)?;
            }
            NavigationMode::Idle | NavigationMode::CoordinateJump => {
                self.view.panel(kind).repaint();
                return Ok(());
            }
        }

        self.refresh_panel(kind)
    }

    fn wheel(&mut self, kind: ViewportKind, rotation: i32) -> Result<()> {
        if rotation == 0 || !self.viewport_ready(kind) {
            return Ok(());
        }

        let pixel = self
            .last_moved
            .get(kind)
            .unwrap_or_else(|| self.mapper.state(kind).pixel_dimension() * 0.5);
        let center = self.mapper.pixel_to_world(GrPoint::new(kind, pixel))?;
        let factor = self.options.committed().zoom_factor;
        self.mapper.zoom(kind, rotation < 0, factor, center.pos)?;

        self.refresh_panel(kind)
    }

    fn resized(&mut self, kind: ViewportKind, size: DVec2) -> Result<()> {
        self.mapper.set_pixel_dimension(kind, size)?;
        if self.mapper.is_initialized(kind) {
            self.refresh_panel(kind)?;
        }
        Ok(())
    }

    fn reset_view(&mut self, kind: ViewportKind) -> Result<()> {
        let envelope = match kind {
            ViewportKind::Georeferenced => self.scene.as_ref().map(|s| s.envelope().clone()),
            ViewportKind::Footprint if !self.footprint.is_empty() => {
                Some(self.footprint.envelope()?)
            }
            ViewportKind::Footprint => None,
        }
        .ok_or(GeorefError::ViewportNotInitialized(kind))?;

        self.mapper.set_envelope(kind, envelope)?;
        self.refresh_panel(kind)
    }

    fn coordinate_jump(&mut self, kind: ViewportKind, x: &str, y: &str, span: &str) -> Result<()> {
        let jump = CoordinateJump::parse(x, y, span)?;
        self.mapper.center_on(kind, jump.center, jump.span)?;
        *self.modes.get_mut(kind) = NavigationMode::Idle;
        info!(viewport = %kind, center = ?jump.center, "jumped to coordinate");
        self.refresh_panel(kind)
    }

    // Data sources

    fn open_wms_layer(&mut self, request: &WmsLayerRequest) -> Result<()> {
        let url = request.validate()?;
        let envelope = request
            .envelope
            .clone()
            .ok_or_else(|| GeorefError::RemoteService("no envelope for this request".into()))?
            .with_crs(request.crs.clone());

        let scene = self.provider.open_wms(request)?;
        info!(%url, layers = ?request.layers, "WMS layer opened");
        self.install_scene(scene, envelope)
    }

    fn open_shapefile(&mut self, path: &Path) -> Result<()> {
        let scene = self.provider.open_shapefile(path)?;
        let envelope = scene.envelope().clone();
        info!(path = %path.display(), "shapefile opened");
        self.install_scene(scene, envelope)
    }

    /// Renders the first image on a copy of the mapper so a failing scene changes nothing.
    fn install_scene(&mut self, scene: Box<dyn Scene>, envelope: Envelope) -> Result<()> {
        let kind = ViewportKind::Georeferenced;
        let mut mapper = self.mapper.clone();
        mapper.set_envelope(kind, envelope)?;
        let image = render_scene(scene.as_ref(), &mapper, kind)?;

        self.mapper = mapper;
        self.scene = Some(scene);
        self.store.reproject(&self.mapper);
        if let Some(image) = image {
            self.view.panel(kind).set_image_to_draw(Some(image));
        }
        self.refresh_overlays(kind);
        Ok(())
    }

    fn open_buildings(&mut self, path: &Path) -> Result<()> {
        let buildings = self.provider.open_buildings(path)?;
        let footprint = Footprint::from_buildings(&buildings);
        let envelope = footprint.envelope()?;

        self.mapper.set_envelope(ViewportKind::Footprint, envelope)?;
        info!(
            path = %path.display(),
            buildings = buildings.len(),
            rings = footprint.rings().len(),
            "footprint opened"
        );
        self.footprint = footprint;
        self.buildings = buildings;
        self.store.reproject(&self.mapper);
        self.refresh_panel(ViewportKind::Footprint)
    }

    fn save_buildings(&self, path: &Path) -> Result<()> {
        let transform = self.computed.as_ref().ok_or_else(|| {
            GeorefError::input("compute a transformation before saving buildings")
        })?;
        if self.buildings.is_empty() {
            return Err(GeorefError::input("no building model is loaded"));
        }

        let georeferenced = transform.apply_to_buildings(&self.buildings);
        save_buildings(path, &georeferenced)?;
        info!(
            path = %path.display(),
            kind = %transform.kind(),
            buildings = georeferenced.len(),
            "georeferenced buildings saved"
        );
        Ok(())
    }

    fn save_point_table(&self, path: &Path) -> Result<()> {
        let crs = self
            .mapper
            .envelope(ViewportKind::Georeferenced)
            .and_then(|e| e.crs().cloned());
        PointTableFile::from_store(&self.store, crs).save(path)
    }

    fn load_point_table(&mut self, path: &Path) -> Result<()> {
        let store = PointTableFile::load(path)?.to_store(&self.mapper)?;

        self.store = store;
        self.clear_pending();
        self.computed = None;
        self.update_residuals_quietly();
        self.view.table().remove_all_rows();
        self.refresh_table();
        self.refresh_all()
    }

    // View updates

    fn refresh_table(&mut self) {
        let rows: Vec<TableRow> = self
            .store
            .entries()
            .iter()
            .map(|e| TableRow {
                georeferenced: e.georeferenced.world_coords.pos,
                footprint: e.footprint.world_coords.pos,
                residual: e.residual.map(|r| DVec2::new(r.dx, r.dy)),
            })
            .collect();

        let table = self.view.table();
        table.set_rows(&rows);
        for kind in VIEWPORTS {
            if let Some(point) = self.pending.get(kind) {
                table.add_row();
                table.set_coords(point.world_coords);
            }
        }
    }

    fn refresh_all(&mut self) -> Result<()> {
        for kind in VIEWPORTS {
            self.refresh_panel(kind)?;
        }
        Ok(())
    }

    fn refresh_panel(&mut self, kind: ViewportKind) -> Result<()> {
        if let (ViewportKind::Georeferenced, Some(scene)) = (kind, &self.scene) {
            if let Some(image) = render_scene(scene.as_ref(), &self.mapper, kind)? {
                self.view.panel(kind).set_image_to_draw(Some(image));
            }
        }

        self.refresh_overlays(kind);
        Ok(())
    }

    /// Points and polygons of one panel.
    fn refresh_overlays(&mut self, kind: ViewportKind) {
        let points: Vec<Point4Values> = self
            .store
            .entries()
            .iter()
            .map(|e| *e.point(kind))
            .collect();
        let rings: &[Ring] = match kind {
            ViewportKind::Footprint => self.footprint.rings(),
            ViewportKind::Georeferenced => self
                .last_result
                .as_ref()
                .map(|r| r.rings.as_slice())
                .unwrap_or(&[]),
        };

        let panel = self.view.panel(kind);
        panel.update_points(&self.mapper);
        panel.set_selected_points(&points, &self.mapper);
        panel.set_polygon_list(rings, &self.mapper);
        panel.repaint();
    }
}

/// The scene's image for the viewport's current window, if the viewport is set up.
fn render_scene(
    scene: &dyn Scene,
    mapper: &CoordinateMapper,
    kind: ViewportKind,
) -> Result<Option<SceneImage>> {
    let Some(envelope) = mapper.envelope(kind).filter(|_| mapper.is_initialized(kind)) else {
        return Ok(None);
    };
    let size = mapper.state(kind).pixel_dimension().round().as_uvec2();
    scene.generate_sub_image(envelope, size).map(Some)
}
