//! Walk the chain of clusters that holds one file
use log::debug;

use std::fmt::{Display, Formatter, Result};

use crate::cluster::{AllocationTable, ClusterLink};
use crate::error::FAT12Error;
use crate::layout::LayoutDescriptor;

/// Where one cluster of a chain lives in the image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterLocation {
    /// Cluster number, 2 or higher
    pub cluster: u16,
    /// Byte offset of the cluster in the image
    pub offset: u64,
}

/// How a chain stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainEnd {
    /// The last cluster carried an end-of-chain marker
    EndOfChain,
    /// This cluster's entry marked it bad
    BadCluster(u16),
}

impl Display for ChainEnd {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ChainEnd::EndOfChain => write!(f, "end of chain"),
            ChainEnd::BadCluster(cluster) => write!(f, "bad cluster after 0x{:03X}", cluster),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Cursor {
    Start(u16),
    After(u16),
    Done,
}

/// A lazy walk along one cluster chain.
///
/// The first item is the start cluster.  The link out of a cluster is only
/// looked up when the next item is asked for, so the caller can read each
/// cluster before the walk moves on, and nothing past an end-of-chain or bad
/// cluster marker is ever touched.
///
/// The walk yields at most `max_length` clusters.  A longer chain, most
/// likely one that loops back on itself, ends with
/// `FAT12Error::ChainLengthExceeded`.  Every error ends the walk.
pub struct ClusterChain<'a> {
    table: &'a AllocationTable,
    layout: &'a LayoutDescriptor,
    start: u16,
    max_length: u32,
    visited: u32,
    cursor: Cursor,
    end: Option<ChainEnd>,
}

impl<'a> ClusterChain<'a> {
    /// Start a walk at cluster `start`
    pub fn new(
        table: &'a AllocationTable,
        layout: &'a LayoutDescriptor,
        start: u16,
        max_length: u32,
    ) -> Self {
        ClusterChain {
            table,
            layout,
            start,
            max_length,
            visited: 0,
            cursor: Cursor::Start(start),
            end: None,
        }
    }

    /// How the walk stopped, `None` while it's still going or if it failed
    pub fn end(&self) -> Option<ChainEnd> {
        self.end
    }

    /// Number of clusters yielded so far
    pub fn len(&self) -> u32 {
        self.visited
    }

    /// Returns true if no cluster has been yielded yet
    pub fn is_empty(&self) -> bool {
        self.visited == 0
    }

    fn visit(&mut self, cluster: u16) -> Option<std::result::Result<ClusterLocation, FAT12Error>> {
        if !self.layout.is_data_cluster(cluster) {
            self.cursor = Cursor::Done;
            return Some(Err(FAT12Error::InvalidCluster {
                cluster,
                cluster_count: self.layout.cluster_count(),
            }));
        }
        if self.visited >= self.max_length {
            self.cursor = Cursor::Done;
            return Some(Err(FAT12Error::ChainLengthExceeded {
                start: self.start,
                limit: self.max_length,
            }));
        }

        self.visited += 1;
        self.cursor = Cursor::After(cluster);
        let offset = self.layout.cluster_offset(cluster);
        debug!("Cluster 0x{:03X} at offset 0x{:X}", cluster, offset);

        Some(Ok(ClusterLocation { cluster, offset }))
    }

    fn finish(&mut self, end: ChainEnd) -> Option<std::result::Result<ClusterLocation, FAT12Error>> {
        debug!("Chain from 0x{:03X} stops: {}", self.start, end);
        self.end = Some(end);
        self.cursor = Cursor::Done;
        None
    }
}

impl Iterator for ClusterChain<'_> {
    type Item = std::result::Result<ClusterLocation, FAT12Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor {
            Cursor::Done => None,
            Cursor::Start(cluster) => self.visit(cluster),
            Cursor::After(previous) => match self.table.next_cluster(previous) {
                Ok(ClusterLink::Next(cluster)) => self.visit(cluster),
                Ok(ClusterLink::EndOfChain) => self.finish(ChainEnd::EndOfChain),
                Ok(ClusterLink::BadCluster) => self.finish(ChainEnd::BadCluster(previous)),
                Err(e) => {
                    self.cursor = Cursor::Done;
                    Some(Err(e))
                }
            },
        }
    }
}
