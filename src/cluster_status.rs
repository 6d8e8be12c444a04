use termcolor::{Color, ColorSpec};

/// Lifecycle state shared by clusters, snapshots and subnet groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceStatus {
    Available,
    Creating,
    Deleting,
    Modifying,
    Resizing,
    Rebooting,
    Paused,
    Incompatible,
    Failed,
    Unknown,
}

impl From<&str> for ResourceStatus {
    fn from(value: &str) -> Self {
        use ResourceStatus::*;
        match value.to_ascii_lowercase().as_str() {
            "available" | "complete" | "active" => Available,
            "creating" | "final-snapshot" => Creating,
            "deleting" | "deleted" => Deleting,
            "modifying" | "renaming" | "rotating-keys" | "updating-hsm" => Modifying,
            "resizing" | "prep-for-resize" | "resize-cleanup" | "cancelling-resize" => Resizing,
            "rebooting" => Rebooting,
            "paused" => Paused,
            "failed" | "hardware-failure" | "storage-full" | "invalid" | "incomplete" => Failed,
            s if s.starts_with("incompatible-") => Incompatible,
            _ => Unknown,
        }
    }
}

impl ResourceStatus {
    pub(crate) fn color_spec(&self) -> Option<ColorSpec> {
        let mut spec = ColorSpec::new();
        match self {
            Self::Creating
            | Self::Deleting
            | Self::Modifying
            | Self::Resizing
            | Self::Rebooting => {
                spec.set_fg(Some(Color::Blue));
            }

            Self::Available => {
                spec.set_fg(Some(Color::Green));
            }

            Self::Paused => {
                spec.set_fg(Some(Color::Yellow));
            }

            Self::Failed | Self::Incompatible => {
                spec.set_fg(Some(Color::Red));
            }

            Self::Unknown => return None,
        };
        Some(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cluster_states() {
        assert_eq!(ResourceStatus::from("available"), ResourceStatus::Available);
        assert_eq!(ResourceStatus::from("prep-for-resize"), ResourceStatus::Resizing);
        assert_eq!(
            ResourceStatus::from("incompatible-network"),
            ResourceStatus::Incompatible
        );
        assert_eq!(ResourceStatus::from("Complete"), ResourceStatus::Available);
        assert_eq!(ResourceStatus::from("something-new"), ResourceStatus::Unknown);
    }

    #[test]
    fn colours() {
        assert_eq!(
            ResourceStatus::Available.color_spec().unwrap().fg(),
            Some(&Color::Green)
        );
        assert_eq!(
            ResourceStatus::Failed.color_spec().unwrap().fg(),
            Some(&Color::Red)
        );
        assert!(ResourceStatus::Unknown.color_spec().is_none());
    }
}
