//! Backend selection. Only Windows has a loopback backend; elsewhere the
//! binary still parses arguments but every capture fails as unsupported.

#[cfg(target_os = "windows")]
pub use slr_windows::{
    WasapiDeviceCatalog as PlatformCatalog, WasapiLoopbackCapture as PlatformCapture,
    WasapiSilenceRenderer as PlatformSilence,
};

#[cfg(not(target_os = "windows"))]
pub use unsupported::{PlatformCapture, PlatformCatalog, PlatformSilence};

#[cfg(not(target_os = "windows"))]
mod unsupported {
    use slr_core::{
        AudioDevice, AudioFormat, CaptureError, CaptureProvider, DeviceCatalog, FrameSender, SilenceRenderer,
        StopSignal,
    };

    /// Catalog with no endpoints.
    #[derive(Debug, Default)]
    pub struct PlatformCatalog;

    impl PlatformCatalog {
        pub fn new() -> Self {
            Self
        }
    }

    impl DeviceCatalog for PlatformCatalog {
        fn list(&self) -> Result<Vec<AudioDevice>, CaptureError> {
            Ok(Vec::new())
        }

        fn default_device(&self) -> Result<AudioDevice, CaptureError> {
            Err(CaptureError::DeviceNotAvailable)
        }
    }

    pub struct PlatformCapture {
        device: AudioDevice,
    }

    impl PlatformCapture {
        pub fn for_device(device: &AudioDevice) -> Self {
            Self { device: device.clone() }
        }
    }

    impl CaptureProvider for PlatformCapture {
        fn device_info(&self) -> AudioDevice {
            self.device.clone()
        }

        fn start(&mut self, _frames: FrameSender, _stop: StopSignal) -> Result<AudioFormat, CaptureError> {
            Err(CaptureError::Unsupported)
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }
    }

    pub struct PlatformSilence;

    impl PlatformSilence {
        pub fn for_device(_device: &AudioDevice) -> Self {
            Self
        }
    }

    impl SilenceRenderer for PlatformSilence {
        fn start(&mut self, _format: &AudioFormat) -> Result<(), CaptureError> {
            Err(CaptureError::Unsupported)
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn catalog_is_empty_without_default() {
            let catalog = PlatformCatalog::new();
            assert!(catalog.list().unwrap().is_empty());
            assert_eq!(catalog.default_device(), Err(CaptureError::DeviceNotAvailable));
        }
    }
}
