use crate::models::audio_models::AudioDevice;
use crate::models::error::CaptureError;

/// Enumerates active rendering endpoints.
///
/// Implementations may re-enumerate on every call; nothing is cached.
pub trait DeviceCatalog {
    /// Active rendering endpoints, in enumeration order.
    fn list(&self) -> Result<Vec<AudioDevice>, CaptureError>;

    /// The system default multimedia rendering endpoint.
    fn default_device(&self) -> Result<AudioDevice, CaptureError>;

    /// Exact match of `id` against [`DeviceCatalog::list`].
    fn resolve(&self, id: &str) -> Result<AudioDevice, CaptureError> {
        self.list()?
            .into_iter()
            .find(|device| device.id == id)
            .ok_or_else(|| CaptureError::DeviceNotFound(id.to_string()))
    }

    /// Device list block as printed by `--list` and `--help`.
    fn device_list_text(&self) -> Result<String, CaptureError> {
        let mut text = String::from("Device List:\n\tFriendlyName :\tID\n");
        for device in self.list()? {
            text.push('\t');
            text.push_str(&device.to_string());
            text.push('\n');
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoDevices;

    impl DeviceCatalog for TwoDevices {
        fn list(&self) -> Result<Vec<AudioDevice>, CaptureError> {
            Ok(vec![
                AudioDevice {
                    id: "{speakers}".into(),
                    name: "Speakers".into(),
                    is_default: true,
                },
                AudioDevice {
                    id: "{headphones}".into(),
                    name: "Headphones".into(),
                    is_default: false,
                },
            ])
        }

        fn default_device(&self) -> Result<AudioDevice, CaptureError> {
            Ok(self.list()?.remove(0))
        }
    }

    #[test]
    fn resolve_is_exact() {
        let catalog = TwoDevices;
        assert_eq!(catalog.resolve("{headphones}").unwrap().name, "Headphones");
        assert_eq!(
            catalog.resolve("{HEADPHONES}"),
            Err(CaptureError::DeviceNotFound("{HEADPHONES}".into()))
        );
        assert!(catalog.resolve("{head").is_err());
    }

    #[test]
    fn list_text_has_one_line_per_device() {
        let text = TwoDevices.device_list_text().unwrap();
        assert_eq!(
            text,
            "Device List:\n\tFriendlyName :\tID\n\t\"Speakers\" : {speakers}\n\t\"Headphones\" : {headphones}\n"
        );
    }
}
