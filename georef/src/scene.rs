use std::path::Path;

use glam::UVec2;
use url::Url;

use crate::envelope::{Crs, Envelope};
use crate::error::{GeorefError, Result};
use crate::footprint::Building;

/// RGBA8 pixels for one viewport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SceneImage {
    pub size: UVec2,
    pub rgba: Vec<u8>,
}

/// A raster backed source that renders arbitrary world windows.
pub trait Scene {
    /// Full extent of the data.
    fn envelope(&self) -> &Envelope;

    fn generate_sub_image(&self, envelope: &Envelope, size: UVec2) -> Result<SceneImage>;
}

/// Opens scenes and building models. Calls block the interaction thread.
pub trait SceneProvider {
    fn open_wms(&mut self, request: &WmsLayerRequest) -> Result<Box<dyn Scene>>;

    fn open_shapefile(&mut self, path: &Path) -> Result<Box<dyn Scene>>;

    fn open_buildings(&mut self, path: &Path) -> Result<Vec<Building>>;
}

/// Parameters picked in the "open WMS layer" dialog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WmsLayerRequest {
    pub url: String,
    pub layers: Vec<String>,
    pub format: Option<String>,
    pub crs: Option<Crs>,
    pub envelope: Option<Envelope>,
}

impl WmsLayerRequest {
    /// Checks the request before anything is fetched. Returns the parsed service URL.
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(self.url.trim())
            .map_err(|e| GeorefError::input(format!("malformed URL '{}': {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GeorefError::input(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }
        if self.layers.iter().all(|l| l.trim().is_empty()) {
            return Err(GeorefError::input("There is no Layer selected"));
        }
        if self.format.as_deref().map_or(true, |f| f.trim().is_empty()) {
            return Err(GeorefError::input("There is no format selected"));
        }
        if self.crs.is_none() {
            return Err(GeorefError::input("There is no CRS selected"));
        }
        if self.envelope.is_none() {
            return Err(GeorefError::RemoteService(
                "There is no Envelope for this request".to_string(),
            ));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn complete() -> WmsLayerRequest {
        WmsLayerRequest {
            url: "https://maps.example.org/wms?SERVICE=WMS".to_string(),
            layers: vec!["orthophoto".to_string()],
            format: Some("image/png".to_string()),
            crs: Some(Crs::new("EPSG:25832")),
            envelope: Some(Envelope::new(DVec2::ZERO, DVec2::new(100.0, 100.0)).unwrap()),
        }
    }

    fn message(err: GeorefError) -> String {
        err.to_string()
    }

    #[test]
    fn complete_request_is_valid() {
        let url = complete().validate().unwrap();
        assert_eq!(url.host_str(), Some("maps.example.org"));
    }

    #[test]
    fn reports_first_missing_part() {
        let mut request = complete();
        request.layers = vec![" ".to_string()];
        assert!(message(request.validate().unwrap_err()).contains("no Layer selected"));

        let mut request = complete();
        request.format = None;
        assert!(message(request.validate().unwrap_err()).contains("no format selected"));

        let mut request = complete();
        request.crs = None;
        assert!(message(request.validate().unwrap_err()).contains("no CRS selected"));

        let mut request = complete();
        request.envelope = None;
        assert!(matches!(
            request.validate(),
            Err(GeorefError::RemoteService(_))
        ));
    }

    #[test]
    fn malformed_url_is_input_error() {
        for url in ["not a url", "ftp://maps.example.org/wms", ""] {
            let request = WmsLayerRequest {
                url: url.to_string(),
                ..complete()
            };
            assert!(matches!(
                request.validate(),
                Err(GeorefError::InputValidation(_))
            ));
        }
    }
}
