//! Render graph compilation.
//!
//! Turns the pass and attachment declarations of a
//! [`RenderGraph`](crate::render_graph::RenderGraph) into an execution plan
//! ([`CompiledGraph`]):
//!
//! 1. **Topological Sort** - Kahn's algorithm over read-after-write edges.
//!    Ready passes are taken lowest declaration index first, so the same
//!    declarations always compile to the same order.
//! 2. **Cycle Detection** - Passes left with unresolved dependencies form a cycle.
//! 3. **Lifetimes** - First and last execution step touching each attachment.
//!    The graph output stays alive until the last step.
//! 4. **Frame Buffer Grouping** - One frame buffer per distinct write set.
//! 5. **Storage Aliasing** - Attachments with matching format and size whose
//!    lifetimes don't overlap share one backing texture.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::backend::types::TextureFormat;
use crate::render_graph::attachment::{Attachment, AttachmentId, SizePolicy};
use crate::render_graph::pass::{PassId, PassNode};

/// Errors raised while building or compiling a graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Passes that depend on each other in a loop
    #[error("Render graph contains a cyclic dependency between passes {passes:?}")]
    CyclicDependency { passes: Vec<String> },

    #[error("Pass '{pass}' reads attachment '{attachment}' which no pass writes")]
    MissingProducer { pass: String, attachment: String },

    /// A pass cannot sample an attachment it renders into
    #[error("Pass '{pass}' both reads and writes attachment '{attachment}'")]
    ReadWriteConflict { pass: String, attachment: String },

    /// Attachments sharing a frame buffer must resolve to one size
    #[error("Pass '{pass}' writes '{first}' and '{other}' which have different sizes")]
    MismatchedSizes {
        pass: String,
        first: String,
        other: String,
    },

    #[error("Effect '{effect}' needs {input} but the graph provides none")]
    MissingEffectInput { effect: String, input: String },

    #[error("Unknown attachment: {0:?}")]
    UnknownAttachment(AttachmentId),

    #[error("Unknown pass: {0:?}")]
    UnknownPass(PassId),

    #[error("Pass '{0}' presents the graph output but no output attachment is set")]
    MissingOutput(String),
}

/// Attachment lifetime in terms of execution steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLifetime {
    pub first_use: usize,
    pub last_use: usize,
}

impl AttachmentLifetime {
    pub fn contains(&self, step: usize) -> bool {
        step >= self.first_use && step <= self.last_use
    }
}

/// A frame buffer shared by every pass writing the same set of attachments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBufferGroup {
    /// Attachments in the write order of the first pass using the group
    pub attachments: Vec<AttachmentId>,
    /// Passes rendering into this frame buffer, in execution order
    pub passes: Vec<PassId>,
}

/// One backing texture, possibly shared by several attachments
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSlot {
    pub format: TextureFormat,
    pub size: SizePolicy,
    pub persistent: bool,
    /// Attachments stored here, by first use
    pub attachments: Vec<AttachmentId>,
    busy_until: usize,
}

/// A compiled render graph ready for execution
#[derive(Debug, Default)]
pub struct CompiledGraph {
    pass_order: Vec<PassId>,
    lifetimes: HashMap<AttachmentId, AttachmentLifetime>,
    frame_buffers: Vec<FrameBufferGroup>,
    pass_frame_buffers: HashMap<PassId, usize>,
    storage: Vec<StorageSlot>,
    attachment_storage: HashMap<AttachmentId, usize>,
}

impl CompiledGraph {
    /// Pass execution order
    pub fn pass_order(&self) -> &[PassId] {
        &self.pass_order
    }

    pub fn pass_count(&self) -> usize {
        self.pass_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pass_order.is_empty()
    }

    /// Execution step of a pass
    pub fn step_of(&self, pass: PassId) -> Option<usize> {
        self.pass_order.iter().position(|p| *p == pass)
    }

    /// Lifetime of an attachment, `None` if no pass touches it
    pub fn lifetime(&self, attachment: AttachmentId) -> Option<AttachmentLifetime> {
        self.lifetimes.get(&attachment).copied()
    }

    /// Check if an attachment is alive at a given execution step
    pub fn is_attachment_alive(&self, attachment: AttachmentId, step: usize) -> bool {
        self.lifetimes
            .get(&attachment)
            .is_some_and(|lifetime| lifetime.contains(step))
    }

    pub fn frame_buffers(&self) -> &[FrameBufferGroup] {
        &self.frame_buffers
    }

    pub fn frame_buffer_count(&self) -> usize {
        self.frame_buffers.len()
    }

    /// Index of the frame buffer a pass renders into; passes without
    /// writes have none
    pub fn frame_buffer_of(&self, pass: PassId) -> Option<usize> {
        self.pass_frame_buffers.get(&pass).copied()
    }

    pub fn storage_slots(&self) -> &[StorageSlot] {
        &self.storage
    }

    pub fn storage_slot_count(&self) -> usize {
        self.storage.len()
    }

    pub fn storage_slot_of(&self, attachment: AttachmentId) -> Option<usize> {
        self.attachment_storage.get(&attachment).copied()
    }

    /// Attachment to storage slot mapping
    pub fn attachment_storage(&self) -> impl Iterator<Item = (AttachmentId, usize)> + '_ {
        self.attachment_storage.iter().map(|(a, s)| (*a, *s))
    }

    /// Check if two attachments are backed by the same texture
    pub fn shares_storage(&self, a: AttachmentId, b: AttachmentId) -> bool {
        match (self.storage_slot_of(a), self.storage_slot_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}

/// Compile pass and attachment declarations into an execution plan.
///
/// `nodes` are indexed by [`PassId`] and `attachments` by [`AttachmentId`].
/// A pass depends on every writer of each attachment it reads. Several
/// writers of one attachment run in declaration order.
///
/// # Returns
///
/// * `Ok(CompiledGraph)` - Pass order, lifetimes, frame buffers and storage
/// * `Err(GraphError::MissingProducer)` - A read attachment has no writer
/// * `Err(GraphError::CyclicDependency)` - If the graph contains a cycle
pub fn compile(
    nodes: &[PassNode],
    attachments: &[Attachment],
    output: Option<AttachmentId>,
) -> Result<CompiledGraph, GraphError> {
    if let Some(output) = output {
        if output.index() >= attachments.len() {
            return Err(GraphError::UnknownAttachment(output));
        }
    }

    let reads = effective_reads(nodes, output)?;
    let dependents = build_edges(nodes, attachments, &reads)?;
    let pass_order = sort_passes(nodes, &dependents)?;
    let lifetimes = compute_lifetimes(nodes, &reads, &pass_order, output);
    let (frame_buffers, pass_frame_buffers) = group_frame_buffers(nodes, &pass_order);
    let (storage, attachment_storage) = assign_storage(attachments, &lifetimes);

    Ok(CompiledGraph {
        pass_order,
        lifetimes,
        frame_buffers,
        pass_frame_buffers,
        storage,
        attachment_storage,
    })
}

/// Declared reads plus the graph output for presenting passes
fn effective_reads(
    nodes: &[PassNode],
    output: Option<AttachmentId>,
) -> Result<Vec<Vec<AttachmentId>>, GraphError> {
    nodes
        .iter()
        .map(|node| {
            let mut reads = node.reads.clone();
            if node.presents {
                let output = output.ok_or_else(|| GraphError::MissingOutput(node.name.clone()))?;
                if !reads.contains(&output) {
                    reads.push(output);
                }
            }
            Ok(reads)
        })
        .collect()
}

/// Dependents of each pass, indexed by pass
fn build_edges(
    nodes: &[PassNode],
    attachments: &[Attachment],
    reads: &[Vec<AttachmentId>],
) -> Result<Vec<BTreeSet<usize>>, GraphError> {
    let mut dependents = vec![BTreeSet::new(); nodes.len()];

    for (reader, node) in nodes.iter().enumerate() {
        for id in &reads[reader] {
            let attachment = attachments
                .get(id.index())
                .ok_or(GraphError::UnknownAttachment(*id))?;
            if attachment.producers.is_empty() {
                return Err(GraphError::MissingProducer {
                    pass: node.name.clone(),
                    attachment: attachment.name().to_string(),
                });
            }
            for producer in &attachment.producers {
                if producer.index() != reader {
                    dependents[producer.index()].insert(reader);
                }
            }
        }
    }

    // Writers of the same attachment keep their declaration order
    for attachment in attachments {
        for pair in attachment.producers.windows(2) {
            dependents[pair[0].index()].insert(pair[1].index());
        }
    }

    Ok(dependents)
}

fn sort_passes(
    nodes: &[PassNode],
    dependents: &[BTreeSet<usize>],
) -> Result<Vec<PassId>, GraphError> {
    let mut in_degree = vec![0usize; nodes.len()];
    for targets in dependents {
        for target in targets {
            in_degree[*target] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(index) = ready.pop_first() {
        order.push(nodes[index].id);
        for target in &dependents[index] {
            in_degree[*target] -= 1;
            if in_degree[*target] == 0 {
                ready.insert(*target);
            }
        }
    }

    if order.len() != nodes.len() {
        let passes = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, node)| node.name.clone())
            .collect();
        return Err(GraphError::CyclicDependency { passes });
    }

    Ok(order)
}

fn compute_lifetimes(
    nodes: &[PassNode],
    reads: &[Vec<AttachmentId>],
    pass_order: &[PassId],
    output: Option<AttachmentId>,
) -> HashMap<AttachmentId, AttachmentLifetime> {
    let mut lifetimes: HashMap<AttachmentId, AttachmentLifetime> = HashMap::new();

    for (step, pass) in pass_order.iter().enumerate() {
        let index = pass.index();
        for attachment in reads[index].iter().chain(nodes[index].writes.iter()) {
            let lifetime = lifetimes.entry(*attachment).or_insert(AttachmentLifetime {
                first_use: step,
                last_use: step,
            });
            lifetime.last_use = step;
        }
    }

    if let (Some(output), Some(last)) = (output, pass_order.len().checked_sub(1)) {
        if let Some(lifetime) = lifetimes.get_mut(&output) {
            lifetime.last_use = last;
        }
    }

    lifetimes
}

fn group_frame_buffers(
    nodes: &[PassNode],
    pass_order: &[PassId],
) -> (Vec<FrameBufferGroup>, HashMap<PassId, usize>) {
    let mut groups: Vec<FrameBufferGroup> = Vec::new();
    let mut by_key: HashMap<Vec<AttachmentId>, usize> = HashMap::new();
    let mut pass_frame_buffers = HashMap::new();

    for pass in pass_order {
        let node = &nodes[pass.index()];
        if node.writes.is_empty() {
            continue;
        }

        let mut key = node.writes.clone();
        key.sort();
        let index = *by_key.entry(key).or_insert_with(|| {
            groups.push(FrameBufferGroup {
                attachments: node.writes.clone(),
                passes: Vec::new(),
            });
            groups.len() - 1
        });
        groups[index].passes.push(*pass);
        pass_frame_buffers.insert(*pass, index);
    }

    (groups, pass_frame_buffers)
}

fn assign_storage(
    attachments: &[Attachment],
    lifetimes: &HashMap<AttachmentId, AttachmentLifetime>,
) -> (Vec<StorageSlot>, HashMap<AttachmentId, usize>) {
    let mut live: Vec<(AttachmentLifetime, &Attachment)> = attachments
        .iter()
        .filter_map(|a| lifetimes.get(&a.id()).map(|lifetime| (*lifetime, a)))
        .collect();
    live.sort_by_key(|(lifetime, a)| (lifetime.first_use, a.id()));

    let mut slots: Vec<StorageSlot> = Vec::new();
    let mut attachment_storage = HashMap::new();

    for (lifetime, attachment) in live {
        let format = attachment.format();
        let size = attachment.size();
        let persistent = attachment.hints().is_persistent();

        let reusable = if persistent {
            None
        } else {
            slots.iter().position(|slot| {
                !slot.persistent
                    && slot.format == format
                    && slot.size == size
                    && slot.busy_until < lifetime.first_use
            })
        };

        let index = match reusable {
            Some(index) => index,
            None => {
                slots.push(StorageSlot {
                    format,
                    size,
                    persistent,
                    attachments: Vec::new(),
                    busy_until: lifetime.last_use,
                });
                slots.len() - 1
            }
        };

        let slot = &mut slots[index];
        slot.attachments.push(attachment.id());
        slot.busy_until = lifetime.last_use;
        attachment_storage.insert(attachment.id(), index);
    }

    (slots, attachment_storage)
}
