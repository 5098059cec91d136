//! Data-driven graph definitions
//!
//! A [`GraphDescription`] is the serialized form of a render graph: ordered
//! attachments, ordered passes referring to attachments by name, and the
//! output attachment. It round-trips through RON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::types::AlphaState;
use crate::pipeline::{
    add_post_effect, BlendPass, DeferredLightingPass, OpaquePass, PostEffect, PresentPass,
    SceneTargets, ScreenPass, TranslucentPass,
};
use crate::render_graph::attachment::{AttachmentHints, AttachmentId, SizePolicy};
use crate::render_graph::compiler::GraphError;
use crate::render_graph::graph::RenderGraph;

/// Errors raised while loading or building a graph description
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptionError {
    #[error("Failed to parse graph description: {0}")]
    Parse(String),

    #[error("Failed to serialize graph description: {0}")]
    Serialize(String),

    #[error("'{owner}' references unknown attachment '{name}'")]
    UnknownAttachment { owner: String, name: String },

    #[error("Attachment '{0}' is declared more than once")]
    DuplicateAttachment(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Serializable name of a single [`AttachmentHints`] flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentHint {
    FormatRgba,
    FormatRgbaHdr,
    FormatDepth,
    FormatStencil,
    RenderOnly,
    Persistent,
}

impl AttachmentHint {
    pub fn flag(&self) -> AttachmentHints {
        match self {
            AttachmentHint::FormatRgba => AttachmentHints::FORMAT_RGBA,
            AttachmentHint::FormatRgbaHdr => AttachmentHints::FORMAT_RGBA_HDR,
            AttachmentHint::FormatDepth => AttachmentHints::FORMAT_DEPTH,
            AttachmentHint::FormatStencil => AttachmentHints::FORMAT_STENCIL,
            AttachmentHint::RenderOnly => AttachmentHints::RENDER_ONLY,
            AttachmentHint::Persistent => AttachmentHints::PERSISTENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentDescription {
    pub name: String,
    #[serde(default)]
    pub hints: Vec<AttachmentHint>,
    #[serde(default)]
    pub size: SizePolicy,
}

impl AttachmentDescription {
    pub fn hints(&self) -> AttachmentHints {
        self.hints
            .iter()
            .fold(AttachmentHints::empty(), |acc, hint| acc | hint.flag())
    }
}

/// Blend equation of a blend pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Additive,
    Alpha,
}

impl BlendMode {
    pub fn alpha_state(&self) -> AlphaState {
        match self {
            BlendMode::Additive => AlphaState::ENABLED_ADDITIVE_BLEND,
            BlendMode::Alpha => AlphaState::ENABLED,
        }
    }
}

/// One pass kind with its attachments referenced by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PassDescription {
    Opaque {
        depth: String,
        color: String,
        #[serde(default)]
        normal: Option<String>,
    },
    Translucent {
        depth: String,
        color: String,
    },
    Screen {
        depth: String,
        color: String,
    },
    DeferredLighting {
        depth: String,
        normal: String,
        albedo: String,
        output: String,
    },
    Blend {
        inputs: Vec<String>,
        output: String,
        #[serde(default)]
        mode: BlendMode,
    },
    PostEffect {
        effect: PostEffect,
        input: String,
        output: String,
        /// Scene depth for effects that sample it
        #[serde(default)]
        depth: Option<String>,
        #[serde(default)]
        normal: Option<String>,
    },
    Present,
}

impl PassDescription {
    fn kind(&self) -> &'static str {
        match self {
            PassDescription::Opaque { .. } => "Opaque",
            PassDescription::Translucent { .. } => "Translucent",
            PassDescription::Screen { .. } => "Screen",
            PassDescription::DeferredLighting { .. } => "DeferredLighting",
            PassDescription::Blend { .. } => "Blend",
            PassDescription::PostEffect { .. } => "PostEffect",
            PassDescription::Present => "Present",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    pub attachments: Vec<AttachmentDescription>,
    pub passes: Vec<PassDescription>,
    #[serde(default)]
    pub output: Option<String>,
}

impl GraphDescription {
    pub fn from_ron(source: &str) -> Result<Self, DescriptionError> {
        ron::from_str(source).map_err(|e| DescriptionError::Parse(e.to_string()))
    }

    pub fn to_ron(&self) -> Result<String, DescriptionError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| DescriptionError::Serialize(e.to_string()))
    }

    /// Create the described graph. Attachments are created first, in
    /// order, then passes in order.
    pub fn build(&self) -> Result<RenderGraph, DescriptionError> {
        let mut graph = RenderGraph::new();
        let mut ids: HashMap<&str, AttachmentId> = HashMap::new();

        for attachment in &self.attachments {
            if ids.contains_key(attachment.name.as_str()) {
                return Err(DescriptionError::DuplicateAttachment(attachment.name.clone()));
            }
            let id = graph.create_attachment_with_size(
                &attachment.name,
                attachment.hints(),
                attachment.size,
            );
            ids.insert(&attachment.name, id);
        }

        let lookup = |owner: &str, name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| DescriptionError::UnknownAttachment {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
        };

        for pass in &self.passes {
            let owner = pass.kind();
            match pass {
                PassDescription::Opaque {
                    depth,
                    color,
                    normal,
                } => {
                    let mut opaque = OpaquePass::new(lookup(owner, depth)?, lookup(owner, color)?);
                    if let Some(normal) = normal {
                        opaque = opaque.with_normal(lookup(owner, normal)?);
                    }
                    graph.add_pass(opaque)?;
                }
                PassDescription::Translucent { depth, color } => {
                    graph.add_pass(TranslucentPass::new(lookup(owner, depth)?, lookup(owner, color)?))?;
                }
                PassDescription::Screen { depth, color } => {
                    graph.add_pass(ScreenPass::new(lookup(owner, depth)?, lookup(owner, color)?))?;
                }
                PassDescription::DeferredLighting {
                    depth,
                    normal,
                    albedo,
                    output,
                } => {
                    graph.add_pass(DeferredLightingPass::new(
                        lookup(owner, depth)?,
                        lookup(owner, normal)?,
                        lookup(owner, albedo)?,
                        lookup(owner, output)?,
                    ))?;
                }
                PassDescription::Blend {
                    inputs,
                    output,
                    mode,
                } => {
                    let inputs = inputs
                        .iter()
                        .map(|name| lookup(owner, name))
                        .collect::<Result<Vec<_>, _>>()?;
                    graph.add_pass(BlendPass::with_alpha_state(
                        &inputs,
                        lookup(owner, output)?,
                        mode.alpha_state(),
                    ))?;
                }
                PassDescription::PostEffect {
                    effect,
                    input,
                    output,
                    depth,
                    normal,
                } => {
                    let scene = match depth {
                        Some(depth) => Some(SceneTargets {
                            depth: lookup(owner, depth)?,
                            normal: normal.as_deref().map(|name| lookup(owner, name)).transpose()?,
                        }),
                        None => None,
                    };
                    add_post_effect(
                        &mut graph,
                        *effect,
                        lookup(owner, input)?,
                        lookup(owner, output)?,
                        scene,
                    )?;
                }
                PassDescription::Present => {
                    graph.add_pass(PresentPass::new())?;
                }
            }
        }

        if let Some(output) = &self.output {
            graph.set_output(lookup("output", output)?)?;
        }

        log::debug!(
            "Built graph from description: {} attachments, {} passes",
            self.attachments.len(),
            self.passes.len()
        );
        Ok(graph)
    }
}
