pub mod hcp;
pub mod interaction;

pub use hcp::{Hcp, HcpId, NewHcp};
pub use interaction::{
    Interaction, InteractionField, InteractionFields, InteractionId, InteractionPatch,
    NewInteraction, PatchError, PatchPolicy,
};
