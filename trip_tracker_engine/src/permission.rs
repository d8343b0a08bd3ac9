use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Combined outcome of asking for both permission tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationAccess {
    Full,
    /// Tracking works, but may pause while the app is in the background.
    ForegroundOnly,
    Denied,
}

/// Platform hook for asking the user for location access.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request_foreground(&self) -> PermissionStatus;
    async fn request_background(&self) -> PermissionStatus;
}

/// Asks for foreground access first, and only asks for background access once
/// foreground has been granted.
pub async fn request_access<G: PermissionGate + ?Sized>(gate: &G) -> LocationAccess {
    if gate.request_foreground().await == PermissionStatus::Denied {
        return LocationAccess::Denied;
    }

    match gate.request_background().await {
        PermissionStatus::Granted => LocationAccess::Full,
        PermissionStatus::Denied => LocationAccess::ForegroundOnly,
    }
}

/// Gate with fixed answers. Used where there is no platform to ask,
/// like the replay CLI.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissionGate {
    pub foreground: PermissionStatus,
    pub background: PermissionStatus,
}

impl StaticPermissionGate {
    pub fn granted() -> Self {
        Self {
            foreground: PermissionStatus::Granted,
            background: PermissionStatus::Granted,
        }
    }

    pub fn foreground_only() -> Self {
        Self {
            foreground: PermissionStatus::Granted,
            background: PermissionStatus::Denied,
        }
    }

    pub fn denied() -> Self {
        Self {
            foreground: PermissionStatus::Denied,
            background: PermissionStatus::Denied,
        }
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    async fn request_foreground(&self) -> PermissionStatus {
        self.foreground
    }

    async fn request_background(&self) -> PermissionStatus {
        self.background
    }
}
