use crate::service::command::transport::{CommandParameters, ProtocolError};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trunk {
    Front,
    Rear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCommand {
    Vent,
    Close,
}

/// A command the signed protocol knows how to carry.
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleAction {
    DoorLock,
    DoorUnlock,
    HonkHorn,
    FlashLights,
    ActuateTrunk(Trunk),
    ChargeStart,
    ChargeStop,
    ChargePortOpen,
    ChargePortClose,
    ChargeStandard,
    ChargeMaxRange,
    SetChargeLimit { percent: i64 },
    SetChargingAmps { amps: i64 },
    AutoConditioningStart,
    AutoConditioningStop,
    SetTemps { driver_c: f64, passenger_c: f64 },
    SetPreconditioningMax { on: bool },
    SetSeatHeater { seat: i64, level: i64 },
    SteeringWheelHeater { on: bool },
    SetSentryMode { on: bool },
    SetValetMode { on: bool, password: Option<String> },
    WindowControl { command: WindowCommand, lat: f64, lon: f64 },
    RemoteStartDrive,
    TriggerHomelink { lat: f64, lon: f64 },
    MediaTogglePlayback,
    MediaNextTrack,
    MediaPrevTrack,
    AdjustVolume { volume: f64 },
    ScheduleSoftwareUpdate { offset_sec: i64 },
    CancelSoftwareUpdate,
    SpeedLimitActivate { pin: String },
    SpeedLimitDeactivate { pin: String },
    SpeedLimitSetLimit { limit_mph: f64 },
}

/// Commands the vehicle accepts only through the Fleet REST endpoint.
const REST_ONLY: &[&str] = &[
    "wake_up",
    "navigation_request",
    "navigation_gps_request",
    "navigation_sc_request",
    "upcoming_calendar_entries",
    "remote_boombox",
    "set_vehicle_name",
    "dashcam_save_clip",
];

/// Static mapping from REST command names to protocol actions.
pub struct CommandCatalog;

impl CommandCatalog {
    pub fn resolve(command: &str, params: &CommandParameters) -> Result<VehicleAction, ProtocolError> {
        if REST_ONLY.contains(&command) {
            return Err(ProtocolError::UseRest);
        }
        let p = Params(params);
        let action = match command {
            "door_lock" => VehicleAction::DoorLock,
            "door_unlock" => VehicleAction::DoorUnlock,
            "honk_horn" => VehicleAction::HonkHorn,
            "flash_lights" => VehicleAction::FlashLights,
            "actuate_trunk" => VehicleAction::ActuateTrunk(match p.string("which_trunk")?.as_str() {
                "front" => Trunk::Front,
                "rear" => Trunk::Rear,
                other => {
                    return Err(ProtocolError::InvalidParameters(format!(
                        "unknown trunk '{other}'"
                    )));
                }
            }),
            "charge_start" => VehicleAction::ChargeStart,
            "charge_stop" => VehicleAction::ChargeStop,
            "charge_port_door_open" => VehicleAction::ChargePortOpen,
            "charge_port_door_close" => VehicleAction::ChargePortClose,
            "charge_standard" => VehicleAction::ChargeStandard,
            "charge_max_range" => VehicleAction::ChargeMaxRange,
            "set_charge_limit" => {
                let percent = p.int("percent")?;
                if !(50..=100).contains(&percent) {
                    return Err(ProtocolError::InvalidParameters(
                        "percent must be between 50 and 100".to_string(),
                    ));
                }
                VehicleAction::SetChargeLimit { percent }
            }
            "set_charging_amps" => VehicleAction::SetChargingAmps {
                amps: p.int("charging_amps")?,
            },
            "auto_conditioning_start" => VehicleAction::AutoConditioningStart,
            "auto_conditioning_stop" => VehicleAction::AutoConditioningStop,
            "set_temps" => VehicleAction::SetTemps {
                driver_c: p.float("driver_temp")?,
                passenger_c: p.float("passenger_temp")?,
            },
            "set_preconditioning_max" => VehicleAction::SetPreconditioningMax { on: p.bool("on")? },
            "remote_seat_heater_request" => VehicleAction::SetSeatHeater {
                seat: p.int("seat_position")?,
                level: p.int("level")?,
            },
            "remote_steering_wheel_heater_request" => {
                VehicleAction::SteeringWheelHeater { on: p.bool("on")? }
            }
            "set_sentry_mode" => VehicleAction::SetSentryMode { on: p.bool("on")? },
            "set_valet_mode" => VehicleAction::SetValetMode {
                on: p.bool("on")?,
                password: p.optional_string("password")?,
            },
            "window_control" => VehicleAction::WindowControl {
                command: match p.string("command")?.as_str() {
                    "vent" => WindowCommand::Vent,
                    "close" => WindowCommand::Close,
                    other => {
                        return Err(ProtocolError::InvalidParameters(format!(
                            "unknown window command '{other}'"
                        )));
                    }
                },
                lat: p.optional_float("lat")?.unwrap_or_default(),
                lon: p.optional_float("lon")?.unwrap_or_default(),
            },
            "remote_start_drive" => VehicleAction::RemoteStartDrive,
            "trigger_homelink" => VehicleAction::TriggerHomelink {
                lat: p.float("lat")?,
                lon: p.float("lon")?,
            },
            "media_toggle_playback" => VehicleAction::MediaTogglePlayback,
            "media_next_track" => VehicleAction::MediaNextTrack,
            "media_prev_track" => VehicleAction::MediaPrevTrack,
            "adjust_volume" => VehicleAction::AdjustVolume {
                volume: p.float("volume")?,
            },
            "schedule_software_update" => VehicleAction::ScheduleSoftwareUpdate {
                offset_sec: p.int("offset_sec")?,
            },
            "cancel_software_update" => VehicleAction::CancelSoftwareUpdate,
            "speed_limit_activate" => VehicleAction::SpeedLimitActivate { pin: p.string("pin")? },
            "speed_limit_deactivate" => VehicleAction::SpeedLimitDeactivate { pin: p.string("pin")? },
            "speed_limit_set_limit" => VehicleAction::SpeedLimitSetLimit {
                limit_mph: p.float("limit_mph")?,
            },
            other => return Err(ProtocolError::NotImplemented(other.to_string())),
        };
        Ok(action)
    }
}

/// Lenient accessors: numbers and booleans may also arrive as strings.
struct Params<'a>(&'a CommandParameters);

impl Params<'_> {
    fn get(&self, key: &str) -> Result<&Value, ProtocolError> {
        self.0
            .get(key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ProtocolError::InvalidParameters(format!("missing '{key}'")))
    }

    fn invalid(key: &str, expected: &str) -> ProtocolError {
        ProtocolError::InvalidParameters(format!("'{key}' must be {expected}"))
    }

    fn string(&self, key: &str) -> Result<String, ProtocolError> {
        match self.get(key)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(Self::invalid(key, "a string")),
        }
    }

    fn optional_string(&self, key: &str) -> Result<Option<String>, ProtocolError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(key).map(Some),
        }
    }

    fn int(&self, key: &str) -> Result<i64, ProtocolError> {
        match self.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| Self::invalid(key, "an integer")),
            Value::String(s) => s.trim().parse().map_err(|_| Self::invalid(key, "an integer")),
            _ => Err(Self::invalid(key, "an integer")),
        }
    }

    fn float(&self, key: &str) -> Result<f64, ProtocolError> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| Self::invalid(key, "a number")),
            Value::String(s) => s.trim().parse().map_err(|_| Self::invalid(key, "a number")),
            _ => Err(Self::invalid(key, "a number")),
        }
    }

    fn optional_float(&self, key: &str) -> Result<Option<f64>, ProtocolError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.float(key).map(Some),
        }
    }

    fn bool(&self, key: &str) -> Result<bool, ProtocolError> {
        match self.get(key)? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(Self::invalid(key, "a boolean")),
            },
            _ => Err(Self::invalid(key, "a boolean")),
        }
    }
}
