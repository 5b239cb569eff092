//! The visual component contract
//!
//! A visual is anything the renderer draws for an entity. It lives in the
//! world wrapped in a [`VisualSlot`] and is driven by the render system:
//! `setup` once, then `pre_render`, `render` and `post_render` every frame
//! in the pass it is tagged for. `release` runs when the render system
//! removes the visual or despawns its entity.

use crate::context::RenderContext;
use crate::device::GraphicsDevice;
use crate::error::RenderError;
use crate::material::MaterialLibrary;
use crate::render_pass::RenderPass;
use cinder_core::EntityId;
use cinder_ecs::World;

/// What a visual sees while it is being set up
pub struct SetupContext<'a> {
    pub world: &'a World,
    pub owner: EntityId,
    pub materials: &'a mut MaterialLibrary,
}

pub trait VisualComponent: Send + Sync {
    /// Component name, also its key in scene files
    fn name(&self) -> &'static str;

    fn default_pass(&self) -> RenderPass {
        RenderPass::Main
    }

    /// Resolve dependencies and create materials. An error disables the visual.
    fn setup(&mut self, ctx: &mut SetupContext<'_>) -> cinder_core::Result<()>;

    /// Runs before `render`; `Ok(false)` skips `render` this frame
    fn pre_render(&mut self, _ctx: &mut RenderContext<'_>) -> Result<bool, RenderError> {
        Ok(true)
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError>;

    /// Runs after the entity's children have been drawn
    fn post_render(&mut self, _ctx: &mut RenderContext<'_>) {}

    /// Free device resources the visual owns. Materials it registered with
    /// [`crate::MaterialLibrary::insert_owned`] are released by the caller.
    fn release(&mut self, _device: &mut dyn GraphicsDevice) {}

    /// Serialized form, as stored under [`VisualComponent::name`] in a scene file
    fn to_toml(&self) -> toml::Value;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Waiting for `setup`
    Pending,
    Active,
    /// Setup failed or an owner handle went stale
    Disabled,
}

/// World component holding a visual and its lifecycle state
pub struct VisualSlot {
    pass: RenderPass,
    state: SlotState,
    component: Box<dyn VisualComponent>,
}

impl VisualSlot {
    pub fn new(component: impl VisualComponent + 'static) -> Self {
        Self::from_boxed(Box::new(component))
    }

    pub fn from_boxed(component: Box<dyn VisualComponent>) -> Self {
        Self {
            pass: component.default_pass(),
            state: SlotState::Pending,
            component,
        }
    }

    pub fn with_pass(mut self, pass: RenderPass) -> Self {
        self.pass = pass;
        self
    }

    pub fn pass(&self) -> RenderPass {
        self.pass
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SlotState::Active
    }

    pub fn name(&self) -> &'static str {
        self.component.name()
    }

    pub fn component(&self) -> &dyn VisualComponent {
        self.component.as_ref()
    }

    pub fn component_mut(&mut self) -> &mut dyn VisualComponent {
        self.component.as_mut()
    }

    /// Run setup if pending; returns whether the slot is now active
    pub(crate) fn setup(&mut self, ctx: &mut SetupContext<'_>) -> bool {
        if self.state != SlotState::Pending {
            return self.is_active();
        }
        match self.component.setup(ctx) {
            Ok(()) => self.state = SlotState::Active,
            Err(e) => {
                log::error!(
                    "Setup of {} on '{}' failed, disabling it: {}",
                    self.component.name(),
                    ctx.world.get_name(ctx.owner).unwrap_or_default(),
                    e
                );
                self.state = SlotState::Disabled;
            }
        }
        self.is_active()
    }

    pub(crate) fn disable(&mut self) {
        self.state = SlotState::Disabled;
    }

    /// Release the visual's device resources; a slot put back into a world
    /// goes through setup again
    pub(crate) fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if self.state != SlotState::Pending {
            self.component.release(device);
        }
        self.state = SlotState::Pending;
    }

    /// Send a disabled slot back through setup on the next frame
    pub fn reinitialize(&mut self) {
        self.state = SlotState::Pending;
    }
}
