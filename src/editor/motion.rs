use serde::Serialize;

use crate::document::Document;

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
}

impl Direction {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "home" => Some(Self::Home),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

/// Where `head` lands after one step in `direction`.
///
/// Left and right step one position and cross block boundaries. Up and
/// down jump to the neighbouring leaf block, keeping the offset into the
/// block where it fits. Home and end go to the edges of the current block.
pub fn step(doc: &Document, head: usize, direction: Direction) -> usize {
    let size = doc.size();
    let head = head.min(size);
    let Some((start, end)) = doc.block_bounds(head) else {
        return head;
    };
    match direction {
        Direction::Left => head.saturating_sub(1),
        Direction::Right => (head + 1).min(size),
        Direction::Home => start,
        Direction::End => end,
        Direction::Up => {
            if start == 0 {
                return 0;
            }
            same_column(doc, start - 1, head - start).unwrap_or(head)
        }
        Direction::Down => {
            if end >= size {
                return size;
            }
            same_column(doc, end + 1, head - start).unwrap_or(head)
        }
    }
}

fn same_column(doc: &Document, pos_in_block: usize, column: usize) -> Option<usize> {
    let (start, end) = doc.block_bounds(pos_in_block)?;
    Some((start + column).min(end))
}
