//! Pipeline graph validation
//!
//! Structural checks need only the spec itself. Port checks additionally need
//! the component registry the pipeline was built against.

use std::collections::{HashMap, HashSet};

use crate::domain::pipeline::{InputBinding, PipelineSpec};
use crate::error::{PipelineError, Result};
use crate::registry::ComponentRegistry;

impl PipelineSpec {
    /// Validates the graph shape: unique names, resolvable bindings,
    /// acyclicity and topological ordering of `jobs`.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (index, job) in self.jobs.iter().enumerate() {
            if positions.insert(job.name.as_str(), index).is_some() {
                return Err(PipelineError::DuplicateNode(job.name.clone()));
            }
            if job.timeout_seconds == Some(0) {
                return Err(PipelineError::InvalidTimeout(job.name.clone()));
            }
        }

        for job in &self.jobs {
            for (input, binding) in &job.inputs {
                match binding {
                    InputBinding::Literal { .. } => {}
                    InputBinding::PipelineInput { name } => {
                        if !self.inputs.contains_key(name) {
                            return Err(PipelineError::UndeclaredPipelineInput {
                                node: job.name.clone(),
                                input: input.clone(),
                                name: name.clone(),
                            });
                        }
                    }
                    InputBinding::NodeOutput { node, .. } => {
                        if !positions.contains_key(node.as_str()) {
                            return Err(PipelineError::UnknownNode {
                                node: job.name.clone(),
                                input: input.clone(),
                                upstream: node.clone(),
                            });
                        }
                    }
                }
            }
        }

        self.check_acyclic()?;

        for (index, job) in self.jobs.iter().enumerate() {
            for upstream in job.upstream_nodes() {
                if positions[upstream] >= index {
                    return Err(PipelineError::NotTopological {
                        node: job.name.clone(),
                        upstream: upstream.to_string(),
                    });
                }
            }
        }

        for (name, output) in &self.outputs {
            if !positions.contains_key(output.node.as_str()) {
                return Err(PipelineError::UnresolvedOutput {
                    name: name.clone(),
                    node: output.node.clone(),
                    output: output.output.clone(),
                });
            }
        }

        Ok(())
    }

    /// Full validation: graph shape plus every port checked against the
    /// registered component descriptors.
    pub fn validate_with(&self, registry: &ComponentRegistry) -> Result<()> {
        self.validate()?;

        for job in &self.jobs {
            let descriptor = registry
                .get(&job.component)
                .ok_or_else(|| PipelineError::UnknownComponent(job.component.clone()))?;

            for input in job.inputs.keys() {
                if !descriptor.inputs.contains_key(input) {
                    return Err(PipelineError::UnknownInput {
                        node: job.name.clone(),
                        component: job.component.clone(),
                        input: input.clone(),
                    });
                }
            }

            for (input, spec) in &descriptor.inputs {
                if !spec.optional && !job.inputs.contains_key(input) {
                    return Err(PipelineError::MissingInput {
                        node: job.name.clone(),
                        input: input.clone(),
                    });
                }
            }

            for output in job.output_modes.keys() {
                if !descriptor.outputs.contains_key(output) {
                    return Err(PipelineError::UndeclaredOutput {
                        node: job.name.clone(),
                        upstream: job.name.clone(),
                        output: output.clone(),
                    });
                }
            }

            for (input, binding) in &job.inputs {
                if let InputBinding::NodeOutput { node, output } = binding {
                    self.check_node_output(registry, &job.name, input, node, output)?;
                }
            }
        }

        for (name, output) in &self.outputs {
            let declared = self
                .node(&output.node)
                .and_then(|upstream| registry.get(&upstream.component))
                .is_some_and(|descriptor| descriptor.outputs.contains_key(&output.output));
            if !declared {
                return Err(PipelineError::UnresolvedOutput {
                    name: name.clone(),
                    node: output.node.clone(),
                    output: output.output.clone(),
                });
            }
        }

        Ok(())
    }

    /// Reorders `jobs` topologically, keeping declaration order among
    /// independent nodes, then validates the result.
    pub fn into_topological(mut self) -> Result<Self> {
        self.check_acyclic()?;

        let mut placed: HashSet<String> = HashSet::new();
        let mut pending = std::mem::take(&mut self.jobs);
        let mut ordered = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let ready = pending.iter().position(|job| {
                job.upstream_nodes().all(|upstream| {
                    placed.contains(upstream) || !pending.iter().any(|p| p.name == upstream)
                })
            });

            match ready {
                Some(index) => {
                    let job = pending.remove(index);
                    placed.insert(job.name.clone());
                    ordered.push(job);
                }
                // Unreachable after check_acyclic, but never loop forever.
                None => return Err(PipelineError::Cycle(pending[0].name.clone())),
            }
        }

        self.jobs = ordered;
        self.validate()?;
        Ok(self)
    }

    fn check_node_output(
        &self,
        registry: &ComponentRegistry,
        node: &str,
        input: &str,
        upstream: &str,
        output: &str,
    ) -> Result<()> {
        let upstream_job = self.node(upstream).ok_or_else(|| PipelineError::UnknownNode {
            node: node.to_string(),
            input: input.to_string(),
            upstream: upstream.to_string(),
        })?;

        let declared = registry
            .get(&upstream_job.component)
            .is_some_and(|descriptor| descriptor.outputs.contains_key(output));

        if declared {
            Ok(())
        } else {
            Err(PipelineError::UndeclaredOutput {
                node: node.to_string(),
                upstream: upstream.to_string(),
                output: output.to_string(),
            })
        }
    }

    fn check_acyclic(&self) -> Result<()> {
        let graph: HashMap<&str, Vec<&str>> = self
            .jobs
            .iter()
            .map(|job| (job.name.as_str(), job.upstream_nodes().collect()))
            .collect();

        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for job in &self.jobs {
            if !visited.contains(job.name.as_str())
                && has_cycle(&graph, job.name.as_str(), &mut visited, &mut rec_stack)
            {
                return Err(PipelineError::Cycle(job.name.clone()));
            }
        }

        Ok(())
    }
}

/// Depth-first search for a back edge reachable from `node`
fn has_cycle<'a>(
    graph: &HashMap<&'a str, Vec<&'a str>>,
    node: &'a str,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if has_cycle(graph, neighbor, visited, rec_stack) {
                    return true;
                }
            } else if rec_stack.contains(neighbor) {
                return true;
            }
        }
    }

    rec_stack.remove(node);
    false
}
