pub mod controller;
pub mod envelope;
pub mod error;
pub mod footprint;
pub mod jump;
pub mod mapper;
pub mod options;
pub mod point;
pub mod point_table;
pub mod scene;
pub mod store;
pub mod transform;
pub mod view;

pub use controller::{Controller, ControllerContext, InteractionEvent, NavigationMode};
pub use envelope::{Crs, Envelope};
pub use error::{GeorefError, Result};
pub use footprint::{Building, BuildingPart, Footprint, Ring};
pub use mapper::{CoordinateMapper, ViewportState};
pub use options::{GeorefOptions, OptionsModel};
pub use point::{GrPoint, Point4Values, PointResidual, RowColumn, ViewportKind};
pub use store::{Correspondence, CorrespondenceStore, TableColumn};
pub use transform::{FittedTransform, TransformationResult, TransformationType};
