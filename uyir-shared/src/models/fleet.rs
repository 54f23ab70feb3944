use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::geo::GeoPoint;

/// Ambulance capability class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum VehicleClass {
    /// Basic life support
    #[default]
    Bls,
    /// Advanced life support
    Als,
    /// Neonatal
    Neo,
}

impl VehicleClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Bls => "BLS",
            VehicleClass::Als => "ALS",
            VehicleClass::Neo => "NEO",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLS" => Ok(VehicleClass::Bls),
            "ALS" => Ok(VehicleClass::Als),
            "NEO" => Ok(VehicleClass::Neo),
            other => Err(format!("unknown vehicle class: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    #[serde(alias = "ONLINE", alias = "online")]
    Idle,
    OnTrip,
    Offline,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Idle => "idle",
            VehicleStatus::OnTrip => "on_trip",
            VehicleStatus::Offline => "offline",
        }
    }
}

impl FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" | "online" => Ok(VehicleStatus::Idle),
            "on_trip" => Ok(VehicleStatus::OnTrip),
            "offline" => Ok(VehicleStatus::Offline),
            other => Err(format!("unknown vehicle status: {}", other)),
        }
    }
}

/// An ambulance in the fleet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_no: String,
    pub class: VehicleClass,
    pub status: VehicleStatus,
    pub location: Option<GeoPoint>,
    pub driver_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(plate_no: impl Into<String>, class: VehicleClass, location: Option<GeoPoint>) -> Self {
        Self {
            id: Uuid::new_v4(),
            plate_no: plate_no.into(),
            class,
            status: VehicleStatus::Idle,
            location,
            driver_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Idle with a known position; the only vehicles that may receive offers.
    pub fn is_dispatchable(&self) -> bool {
        self.status == VehicleStatus::Idle && self.location.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub rating: f64,
    pub online: bool,
    pub vehicle_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub capabilities: Vec<String>,
    pub location: GeoPoint,
}

impl Hospital {
    pub fn new(name: impl Into<String>, capabilities: &[&str], location: GeoPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            location,
        }
    }
}
