use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::tree::guide_tree::{find_root, AlnSimple};
use crate::utils::errors::WeaverError;

/// A parsed Newick node. Leaves carry a name; internal nodes may or may not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewickNode {
    pub name: Option<String>,
    pub children: Vec<NewickNode>,
}

impl NewickNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parse a Newick tree string. Branch lengths are accepted and discarded;
/// quoting is not supported, labels run to the next structural character.
pub fn parse(text: &str) -> Result<NewickNode, WeaverError> {
    let bytes = text.trim().as_bytes();
    let mut pos = 0usize;
    let node = parse_subtree(bytes, &mut pos)?;
    if pos < bytes.len() && bytes[pos] == b';' {
        pos += 1;
    }
    if pos != bytes.len() {
        return Err(WeaverError::TreeParse(format!(
            "trailing characters at offset {}",
            pos
        )));
    }
    Ok(node)
}

fn parse_subtree(bytes: &[u8], pos: &mut usize) -> Result<NewickNode, WeaverError> {
    let mut children = Vec::new();
    if *pos < bytes.len() && bytes[*pos] == b'(' {
        *pos += 1;
        loop {
            children.push(parse_subtree(bytes, pos)?);
            match bytes.get(*pos) {
                Some(b',') => {
                    *pos += 1;
                }
                Some(b')') => {
                    *pos += 1;
                    break;
                }
                _ => {
                    return Err(WeaverError::TreeParse(format!(
                        "expected ',' or ')' at offset {}",
                        pos
                    )))
                }
            }
        }
    }
    let name = parse_label(bytes, pos);
    // discard a branch length
    if bytes.get(*pos) == Some(&b':') {
        *pos += 1;
        while *pos < bytes.len()
            && (bytes[*pos].is_ascii_digit()
                || matches!(bytes[*pos], b'.' | b'-' | b'+' | b'e' | b'E'))
        {
            *pos += 1;
        }
    }
    if children.is_empty() && name.is_none() {
        return Err(WeaverError::TreeParse(format!(
            "empty node at offset {}",
            pos
        )));
    }
    Ok(NewickNode { name, children })
}

fn parse_label(bytes: &[u8], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while *pos < bytes.len() && !matches!(bytes[*pos], b'(' | b')' | b',' | b':' | b';') {
        *pos += 1;
    }
    if *pos == start {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes[start..*pos]).into_owned())
    }
}

/**
 * Emit merge pairs in post order. Every internal node contributes one pair
 * per additional child, pairing the representative (leftmost leaf) of its
 * first subtree with the representative of each following subtree — the
 * order a progressive aligner merges the clusters in.
 */
pub fn post_order_pairs(node: &NewickNode) -> Result<Vec<(String, String)>, WeaverError> {
    let mut pairs = Vec::new();
    collect_pairs(node, &mut pairs)?;
    Ok(pairs)
}

fn collect_pairs(
    node: &NewickNode,
    pairs: &mut Vec<(String, String)>,
) -> Result<String, WeaverError> {
    if node.is_leaf() {
        return node
            .name
            .clone()
            .ok_or_else(|| WeaverError::TreeParse("unnamed leaf".to_string()));
    }
    let mut representatives = Vec::with_capacity(node.children.len());
    for child in &node.children {
        representatives.push(collect_pairs(child, pairs)?);
    }
    for other in &representatives[1..] {
        pairs.push((representatives[0].clone(), other.clone()));
    }
    Ok(representatives[0].clone())
}

/**
 * Serialise a merge linkage back to Newick, leaves labelled with their
 * display names. The tree is rebuilt over a directed graph: each accepted
 * merge adds an internal node over the two current cluster roots.
 */
pub fn linkage_to_newick(hits: &[AlnSimple], names: &[String], n: usize) -> String {
    let mut graph: DiGraph<Option<usize>, ()> = DiGraph::new();
    let mut cluster_root: Vec<NodeIndex> = (0..n).map(|i| graph.add_node(Some(i))).collect();
    let mut parent: Vec<usize> = (0..n).collect();
    for hit in hits {
        let u = find_root(&mut parent, hit.query_id);
        let v = find_root(&mut parent, hit.target_id);
        if u == v {
            continue;
        }
        let internal = graph.add_node(None);
        graph.add_edge(internal, cluster_root[u], ());
        graph.add_edge(internal, cluster_root[v], ());
        parent[v] = u;
        cluster_root[u] = internal;
    }
    let root = cluster_root[find_root(&mut parent, 0)];
    let mut out = String::new();
    write_node(&graph, root, names, &mut out);
    out.push(';');
    out
}

fn write_node(
    graph: &DiGraph<Option<usize>, ()>,
    node: NodeIndex,
    names: &[String],
    out: &mut String,
) {
    match graph[node] {
        Some(leaf) => out.push_str(&names[leaf]),
        None => {
            // neighbor iteration yields edges in reverse insertion order
            let mut children: Vec<NodeIndex> =
                graph.neighbors_directed(node, Direction::Outgoing).collect();
            children.reverse();
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_node(graph, *child, names, out);
            }
            out.push(')');
        }
    }
}
