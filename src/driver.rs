//! HPE 3PAR driver flavours supported by the charm.

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::options::keys;

/// Options the 3PAR driver refuses to start without, whatever the transport.
///
/// Mirrors the driver's own flag check in `hpe_3par_base.py`.
pub const REQUIRED_OPTIONS: &[&str] = &[
    keys::API_URL,
    keys::USERNAME,
    keys::PASSWORD,
    keys::SAN_IP,
    keys::SAN_LOGIN,
    keys::SAN_PASSWORD,
];

/// Extra options the iSCSI driver needs to initialise its ports
pub const REQUIRED_OPTIONS_ISCSI: &[&str] = &[keys::ISCSI_IPS];

/// Value of the `driver-type` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum DriverType {
    /// Fibre Channel
    Fc,
    Iscsi,
}

impl DriverType {
    /// Fully-qualified class name written as `volume_driver`
    pub const fn volume_driver(self) -> &'static str {
        match self {
            Self::Fc => "cinder.volume.drivers.hpe.hpe_3par_fc.HPE3PARFCDriver",
            Self::Iscsi => "cinder.volume.drivers.hpe.hpe_3par_iscsi.HPE3PARISCSIDriver",
        }
    }

    /// Mandatory option names for this driver type.
    ///
    /// Computed per call; the fixed set is never extended in place.
    pub fn required_options(self) -> Vec<&'static str> {
        let mut required = REQUIRED_OPTIONS.to_vec();
        if self == Self::Iscsi {
            required.extend_from_slice(REQUIRED_OPTIONS_ISCSI);
        }
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_driver_type() {
        assert_eq!("fc".parse::<DriverType>().unwrap(), DriverType::Fc);
        assert_eq!("iscsi".parse::<DriverType>().unwrap(), DriverType::Iscsi);
        assert!("nfs".parse::<DriverType>().is_err());
        assert!("FC".parse::<DriverType>().is_err());
        assert!("".parse::<DriverType>().is_err());
    }

    #[test]
    fn test_display_matches_option_value() {
        for driver in DriverType::iter() {
            assert_eq!(driver.to_string().parse::<DriverType>().unwrap(), driver);
        }
        assert_eq!(DriverType::Iscsi.as_ref(), "iscsi");
    }

    #[test]
    fn test_volume_driver_table() {
        assert!(DriverType::Fc.volume_driver().ends_with("HPE3PARFCDriver"));
        assert!(DriverType::Iscsi.volume_driver().ends_with("HPE3PARISCSIDriver"));
    }

    #[test]
    fn test_required_options_per_driver() {
        assert_eq!(DriverType::Fc.required_options(), REQUIRED_OPTIONS.to_vec());

        let iscsi = DriverType::Iscsi.required_options();
        assert_eq!(iscsi.len(), REQUIRED_OPTIONS.len() + 1);
        assert!(iscsi.contains(&keys::ISCSI_IPS));

        // Asking for iSCSI first must not leak into the FC set
        assert!(!DriverType::Fc.required_options().contains(&keys::ISCSI_IPS));
    }
}
