// ── PoE domain types ──

use portly_api::parse::{PoePortState, PoeRecord};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::port::AdminState;

/// Delivery state of one port's PoE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PoeDelivery {
    Delivering,
    Searching,
    Disabled,
    Fault,
    Denied,
    Other,
    /// The switch reports no PoE for this port.
    NotApplicable,
    /// PoE status could not be read this poll.
    #[default]
    Unknown,
}

impl From<PoePortState> for PoeDelivery {
    fn from(state: PoePortState) -> Self {
        match state {
            PoePortState::Delivering => Self::Delivering,
            PoePortState::Searching => Self::Searching,
            PoePortState::Disabled => Self::Disabled,
            PoePortState::Fault => Self::Fault,
            PoePortState::Denied => Self::Denied,
            PoePortState::Other => Self::Other,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PoePriority {
    Low,
    High,
    Critical,
}

/// PoE state of one port. Every port in a snapshot has one, even
/// ports without PoE hardware.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoeStatus {
    pub index: u16,
    pub admin: AdminState,
    pub delivery: PoeDelivery,
    pub power_draw_w: Option<f64>,
    pub voltage_v: Option<f64>,
    pub current_ma: Option<f64>,
    pub power_class: Option<u8>,
    pub priority: Option<PoePriority>,
    /// Toggling PoE on this port is refused.
    pub excluded: bool,
}

impl PoeStatus {
    pub fn not_applicable(index: u16) -> Self {
        Self {
            index,
            delivery: PoeDelivery::NotApplicable,
            ..Self::default()
        }
    }

    pub fn unknown(index: u16) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Build from a parsed record.
    ///
    /// An enabled port reported as delivering with a measured 0.0 W draw
    /// is stored as `Searching`: nothing is powered on it.
    pub fn from_record(record: &PoeRecord) -> Self {
        let admin = AdminState::from_flag(record.admin_enabled);
        let mut delivery = record.state.map_or(PoeDelivery::Unknown, PoeDelivery::from);
        if delivery == PoeDelivery::Delivering
            && admin == AdminState::Enabled
            && record.power_draw_w.is_some_and(|draw| draw <= 0.0)
        {
            delivery = PoeDelivery::Searching;
        }

        Self {
            index: record.port,
            admin,
            delivery,
            power_draw_w: record.power_draw_w,
            voltage_v: record.voltage_v,
            current_ma: record.current_ma,
            power_class: record.power_class,
            priority: record.priority.as_deref().and_then(|p| p.parse().ok()),
            excluded: false,
        }
    }

    /// The switch has PoE hardware behind this port.
    pub fn is_capable(&self) -> bool {
        !matches!(self.delivery, PoeDelivery::NotApplicable | PoeDelivery::Unknown)
    }

    /// Power is actually flowing.
    ///
    /// A measured draw wins over the status word: admin-enabled with a
    /// 0.0 W draw is not delivering, whatever the status says.
    pub fn delivering(&self) -> bool {
        match self.power_draw_w {
            Some(draw) => self.admin == AdminState::Enabled && draw > 0.0,
            None => self.delivery == PoeDelivery::Delivering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(admin: AdminState, delivery: PoeDelivery, draw: Option<f64>) -> PoeStatus {
        PoeStatus {
            index: 1,
            admin,
            delivery,
            power_draw_w: draw,
            ..PoeStatus::default()
        }
    }

    #[test]
    fn zero_draw_is_not_delivering() {
        let poe = status(AdminState::Enabled, PoeDelivery::Delivering, Some(0.0));
        assert!(!poe.delivering());
    }

    #[test]
    fn positive_draw_requires_admin_enabled() {
        assert!(status(AdminState::Enabled, PoeDelivery::Searching, Some(4.8)).delivering());
        assert!(!status(AdminState::Disabled, PoeDelivery::Delivering, Some(4.8)).delivering());
    }

    #[test]
    fn status_word_decides_without_a_measurement() {
        assert!(status(AdminState::Unknown, PoeDelivery::Delivering, None).delivering());
        assert!(!status(AdminState::Enabled, PoeDelivery::Searching, None).delivering());
    }

    #[test]
    fn zero_draw_record_is_not_stored_as_delivering() {
        let record = PoeRecord {
            port: 2,
            admin_enabled: Some(true),
            state: Some(PoePortState::Delivering),
            power_draw_w: Some(0.0),
            ..PoeRecord::default()
        };
        let poe = PoeStatus::from_record(&record);
        assert_eq!(poe.delivery, PoeDelivery::Searching);
        assert!(!poe.delivering());
        assert!(poe.is_capable());

        let powered = PoeStatus::from_record(&PoeRecord {
            power_draw_w: Some(6.2),
            ..record
        });
        assert_eq!(powered.delivery, PoeDelivery::Delivering);
        assert!(powered.delivering());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        let record = PoeRecord {
            port: 2,
            priority: Some("critical".into()),
            state: Some(PoePortState::Delivering),
            ..PoeRecord::default()
        };
        let poe = PoeStatus::from_record(&record);
        assert_eq!(poe.priority, Some(PoePriority::Critical));
        assert!(poe.is_capable());
        assert!(!PoeStatus::not_applicable(3).is_capable());
    }
}
