use tokio::sync::watch;

/// Master/Slave split (§4.H, §9 "dynamic dispatch across master/slave").
/// Modeled as a tagged variant behind a `tokio::sync::watch` channel — a
/// field swap on election change, not a trait-object swap, so the switch is
/// instantaneous from every caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Passive cache warming only: no writes, no signals, no reschedules.
    Slave,
    /// Drives the full fault-cascade / reschedule / reconciliation behavior.
    Master,
}

/// Broadcasts the current [`Role`] to every component that behaves
/// differently under election. Cloning a gate gives an independent watcher
/// handle over the same shared state.
#[derive(Debug, Clone)]
pub struct LeaderRoleGate {
    tx: watch::Sender<Role>,
}

impl LeaderRoleGate {
    pub fn new(initial: Role) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> Role {
        *self.tx.borrow()
    }

    pub fn is_master(&self) -> bool {
        self.current() == Role::Master
    }

    /// Flip the active role. Handlers already in flight under the old role
    /// are allowed to finish; no new side effects should be issued under the
    /// stale role once this returns.
    pub fn set(&self, role: Role) {
        self.tx.send_replace(role);
    }

    pub fn watch(&self) -> watch::Receiver<Role> {
        self.tx.subscribe()
    }
}

impl Default for LeaderRoleGate {
    fn default() -> Self {
        Self::new(Role::Slave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_slave_by_default() {
        let gate = LeaderRoleGate::default();
        assert_eq!(gate.current(), Role::Slave);
        assert!(!gate.is_master());
    }

    #[test]
    fn set_flips_role_instantaneously() {
        let gate = LeaderRoleGate::new(Role::Slave);
        gate.set(Role::Master);
        assert!(gate.is_master());
    }
}
