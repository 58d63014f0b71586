//! Rendering endpoint enumeration via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator` to list active render (speaker/headphone)
//! endpoints with their friendly names and to resolve the default
//! multimedia endpoint.

use windows::Win32::Devices::FunctionDiscovery::PKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::STGM_READ;

use slr_core::models::audio_models::AudioDevice;
use slr_core::models::error::CaptureError;
use slr_core::traits::device_catalog::DeviceCatalog;

use crate::com::{self, ComScope};

/// Device catalog backed by the Windows MMDevice API.
///
/// Every query joins COM for its own duration, so the catalog can be used
/// from any thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct WasapiDeviceCatalog;

impl WasapiDeviceCatalog {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceCatalog for WasapiDeviceCatalog {
    fn list(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        let _com = ComScope::enter()?;
        let enumerator = com::device_enumerator()?;

        unsafe {
            let collection = enumerator
                .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
                .map_err(|e| CaptureError::Unknown(format!("EnumAudioEndpoints failed: {}", e)))?;

            let count = collection
                .GetCount()
                .map_err(|e| CaptureError::Unknown(format!("GetCount failed: {}", e)))?;

            let default_id = default_render_endpoint(&enumerator)
                .ok()
                .and_then(|d| com::device_id(&d).ok());

            let mut devices = Vec::with_capacity(count as usize);
            for i in 0..count {
                let device = match collection.Item(i) {
                    Ok(d) => d,
                    Err(e) => {
                        log::debug!("skipping endpoint {}: {}", i, e);
                        continue;
                    }
                };
                let id = match com::device_id(&device) {
                    Ok(id) => id,
                    Err(e) => {
                        log::debug!("skipping endpoint {}: {}", i, e);
                        continue;
                    }
                };

                let name = friendly_name(&device).unwrap_or_else(|| format!("Device {}", i));
                let is_default = default_id.as_deref() == Some(id.as_str());
                devices.push(AudioDevice { id, name, is_default });
            }

            log::debug!("found {} active render endpoints", devices.len());
            Ok(devices)
        }
    }

    fn default_device(&self) -> Result<AudioDevice, CaptureError> {
        let _com = ComScope::enter()?;
        let enumerator = com::device_enumerator()?;
        let device = default_render_endpoint(&enumerator)?;

        let id = com::device_id(&device)?;
        let name = friendly_name(&device).unwrap_or_else(|| id.clone());
        Ok(AudioDevice {
            id,
            name,
            is_default: true,
        })
    }
}

fn default_render_endpoint(enumerator: &IMMDeviceEnumerator) -> Result<IMMDevice, CaptureError> {
    unsafe {
        enumerator
            .GetDefaultAudioEndpoint(eRender, eMultimedia)
            .map_err(|_| CaptureError::DeviceNotAvailable)
    }
}

/// Read the PKEY_Device_FriendlyName property from a device.
fn friendly_name(device: &IMMDevice) -> Option<String> {
    unsafe {
        let store = device.OpenPropertyStore(STGM_READ).ok()?;
        let value = store.GetValue(&PKEY_Device_FriendlyName).ok()?;
        let name = value.to_string();
        (!name.is_empty()).then_some(name)
    }
}
