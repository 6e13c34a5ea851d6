//! Kind tag → constructor table.
//!
//! The hub looks up every ADD_DEVICE kind here.  Kinds without a constructor
//! are ignored by the session, so a peer can advertise devices the hub does
//! not understand without being disconnected.
//!
//! Registration is append-only: a kind cannot be replaced or removed once it
//! has a constructor, so a device built for a kind always has the same
//! variant for the lifetime of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::device::{DeviceContext, DeviceHandle, Display, Keyboard, Pointer};
use crate::protocol::messages::DeviceKind;

/// Builds a device for one kind.  Called once per accepted ADD_DEVICE.
pub type DeviceConstructor = Arc<dyn Fn(DeviceContext) -> DeviceHandle + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("device kind {0} is already registered")]
    AlreadyRegistered(DeviceKind),
}

pub struct DeviceRegistry {
    constructors: HashMap<DeviceKind, DeviceConstructor>,
}

impl DeviceRegistry {
    /// A registry that knows no kinds at all.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry with display, pointer and keyboard pre-registered.
    pub fn with_builtin() -> Self {
        let mut constructors: HashMap<DeviceKind, DeviceConstructor> = HashMap::new();
        constructors.insert(
            DeviceKind::DISPLAY,
            Arc::new(|ctx| DeviceHandle::Display(Arc::new(Display::new(ctx)))),
        );
        constructors.insert(
            DeviceKind::POINTER,
            Arc::new(|ctx| DeviceHandle::Pointer(Arc::new(Pointer::new(ctx)))),
        );
        constructors.insert(
            DeviceKind::KEYBOARD,
            Arc::new(|ctx| DeviceHandle::Keyboard(Arc::new(Keyboard::new(ctx)))),
        );
        Self { constructors }
    }

    /// Adds a constructor for `kind`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyRegistered`] if `kind` already has one.
    pub fn register<F>(&mut self, kind: DeviceKind, constructor: F) -> Result<(), RegistryError>
    where
        F: Fn(DeviceContext) -> DeviceHandle + Send + Sync + 'static,
    {
        if self.constructors.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.constructors.insert(kind, Arc::new(constructor));
        Ok(())
    }

    pub fn contains(&self, kind: DeviceKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Builds a device of `kind`, or `None` if the kind is unknown.
    pub fn construct(&self, kind: DeviceKind, ctx: DeviceContext) -> Option<DeviceHandle> {
        self.constructors.get(&kind).map(|ctor| ctor(ctx))
    }

    /// Registered kinds in ascending order.
    pub fn kinds(&self) -> Vec<DeviceKind> {
        let mut kinds: Vec<DeviceKind> = self.constructors.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceEvent};
    use crate::protocol::codec::ProtocolError;
    use crate::protocol::messages::DeviceId;
    use crate::protocol::sink::MockFrameSink;

    /// Minimal third-party device that echoes every event back as `Custom`.
    #[derive(Debug)]
    struct Gamepad {
        did: DeviceId,
    }

    impl Device for Gamepad {
        fn id(&self) -> DeviceId {
            self.did
        }

        fn kind(&self) -> DeviceKind {
            DeviceKind(9)
        }

        fn handle_event(
            &self,
            event_id: u8,
            payload: &[u8],
        ) -> Result<Option<DeviceEvent>, ProtocolError> {
            Ok(Some(DeviceEvent::Custom {
                event_id,
                payload: payload.to_vec(),
            }))
        }
    }

    fn ctx(did: DeviceId) -> DeviceContext {
        DeviceContext::new(0, did, Arc::new(MockFrameSink::new()))
    }

    #[test]
    fn test_builtin_registry_knows_three_kinds() {
        let registry = DeviceRegistry::with_builtin();
        assert_eq!(
            registry.kinds(),
            vec![DeviceKind::DISPLAY, DeviceKind::POINTER, DeviceKind::KEYBOARD]
        );
    }

    #[test]
    fn test_construct_builds_matching_variant() {
        let registry = DeviceRegistry::default();

        let display = registry.construct(DeviceKind::DISPLAY, ctx(0)).unwrap();
        let pointer = registry.construct(DeviceKind::POINTER, ctx(1)).unwrap();
        let keyboard = registry.construct(DeviceKind::KEYBOARD, ctx(2)).unwrap();

        assert!(matches!(display, DeviceHandle::Display(_)));
        assert!(matches!(pointer, DeviceHandle::Pointer(_)));
        assert!(matches!(keyboard, DeviceHandle::Keyboard(_)));
        assert_eq!(keyboard.id(), 2);
    }

    #[test]
    fn test_construct_unknown_kind_returns_none() {
        let registry = DeviceRegistry::default();
        assert!(registry.construct(DeviceKind(9), ctx(0)).is_none());
    }

    #[test]
    fn test_empty_registry_has_no_kinds() {
        let registry = DeviceRegistry::empty();
        assert!(registry.kinds().is_empty());
        assert!(!registry.contains(DeviceKind::DISPLAY));
    }

    #[test]
    fn test_register_custom_kind() {
        // Arrange
        let mut registry = DeviceRegistry::default();

        // Act
        registry
            .register(DeviceKind(9), |ctx| {
                DeviceHandle::Custom(Arc::new(Gamepad {
                    did: ctx.device_id(),
                }))
            })
            .unwrap();

        // Assert
        let handle = registry.construct(DeviceKind(9), ctx(5)).unwrap();
        assert_eq!(handle.kind(), DeviceKind(9));
        assert_eq!(
            handle.as_device().handle_event(1, &[2, 3]).unwrap(),
            Some(DeviceEvent::Custom {
                event_id: 1,
                payload: vec![2, 3],
            })
        );
    }

    #[test]
    fn test_register_existing_kind_is_rejected() {
        let mut registry = DeviceRegistry::default();
        let result = registry.register(DeviceKind::DISPLAY, |ctx| {
            DeviceHandle::Pointer(Arc::new(Pointer::new(ctx)))
        });
        assert_eq!(result, Err(RegistryError::AlreadyRegistered(DeviceKind::DISPLAY)));
        assert!(matches!(
            registry.construct(DeviceKind::DISPLAY, ctx(0)),
            Some(DeviceHandle::Display(_))
        ));
    }
}
