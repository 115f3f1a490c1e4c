//! Huffman trees built from `DHT` segments.
//!
//! A `DHT` gives the number of codes of each length 1 to 16, then the
//! symbols in code order. Walking the tree depth first, left (bit 0) before
//! right (bit 1), and turning the first free positions at each depth into
//! leaves gives exactly the canonical code assignment: shorter codes first,
//! and codes of one length numerically consecutive.

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
  Leaf(u8),
  Branch([Option<u16>; 2]),
}

/// A decoding tree for one Huffman table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
  /// Node 0 is the root.
  nodes: Vec<Node>,
}
impl HuffmanTree {
  /// Builds a tree from the 16 code length counts and the symbol list.
  pub fn from_dht(counts: &[u8; 16], symbols: &[u8]) -> ImageResult<Self> {
    let total: usize = counts.iter().map(|&c| usize::from(c)).sum();
    if total != symbols.len() || total == 0 {
      return Err(ImageError::malformed("JPEG", "Huffman symbol count does not match code lengths"));
    }
    let max_depth = counts.iter().rposition(|&c| c > 0).unwrap_or(0);
    let mut remaining = *counts;
    let mut tree = Self { nodes: vec![Node::Branch([None, None])] };
    let mut next = 0;
    for bit in 0..2 {
      let child = tree.grow(&mut remaining, symbols, &mut next, 0, max_depth);
      if let Node::Branch(children) = &mut tree.nodes[0] {
        children[bit] = child;
      }
    }
    if next != symbols.len() {
      return Err(ImageError::malformed("JPEG", "Huffman code lengths overflow the code space"));
    }
    Ok(tree)
  }

  /// Adds the subtree at `depth` (0 is a code length of 1), giving its index.
  /// Empty subtrees are not stored.
  fn grow(
    &mut self, remaining: &mut [u8; 16], symbols: &[u8], next: &mut usize, depth: usize, max_depth: usize,
  ) -> Option<u16> {
    if remaining[depth] > 0 {
      remaining[depth] -= 1;
      let symbol = symbols[*next];
      *next += 1;
      return Some(self.push(Node::Leaf(symbol)));
    }
    if depth >= max_depth {
      return None;
    }
    let left = self.grow(remaining, symbols, next, depth + 1, max_depth);
    let right = self.grow(remaining, symbols, next, depth + 1, max_depth);
    if left.is_none() && right.is_none() {
      None
    } else {
      Some(self.push(Node::Branch([left, right])))
    }
  }

  fn push(&mut self, node: Node) -> u16 {
    self.nodes.push(node);
    (self.nodes.len() - 1) as u16
  }

  /// Reads one symbol.
  pub(crate) fn decode(&self, bits: &mut BitReader<'_>) -> ImageResult<u8> {
    let mut node = self.nodes[0];
    loop {
      match node {
        Node::Leaf(symbol) => return Ok(symbol),
        Node::Branch(children) => {
          let next = children[usize::from(bits.read_bit()?)].ok_or(ImageError::InvalidHuffmanCode)?;
          node = self.nodes[usize::from(next)];
        }
      }
    }
  }
}
