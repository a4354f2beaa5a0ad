use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use byteorder::{ByteOrder, LittleEndian};

use crate::agent::Action;

pub const CONTROL_PACKET_SIZE: usize = 32;

const HANDBRAKE_BIT: u32 = 1 << 0;
const JUMP_BIT: u32 = 1 << 1;
const BOOST_BIT: u32 = 1 << 2;
// Boost is mirrored into bit 3 as well.
const BOOST_DUPLICATE_BIT: u32 = 1 << 3;
const USE_ITEM_BIT: u32 = 1 << 4;

/// Thresholded controller state for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlState {
    pub throttle: f32,
    pub steer: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
    pub jump: bool,
    pub boost: bool,
    pub handbrake: bool,
    pub use_item: bool,
}

impl From<&Action> for ControlState {
    fn from(action: &Action) -> Self {
        ControlState {
            throttle: action.throttle(),
            steer: action.steer(),
            pitch: action.pitch(),
            yaw: action.yaw(),
            roll: action.roll(),
            jump: action.jump(),
            boost: action.boost(),
            handbrake: action.handbrake(),
            use_item: false,
        }
    }
}

/// The vehicle input block as laid out in the game's player controller.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ControlPacket([u8; CONTROL_PACKET_SIZE]);

impl ControlPacket {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn is_neutral(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

pub fn append_f32(buf: &mut [u8], offset: usize, val: f32) -> usize {
    let end = offset + size_of::<f32>();
    LittleEndian::write_f32(&mut buf[offset..end], val);
    end
}

pub fn append_u32(buf: &mut [u8], offset: usize, val: u32) -> usize {
    let end = offset + size_of::<u32>();
    LittleEndian::write_u32(&mut buf[offset..end], val);
    end
}

pub fn retrieve_f32(buf: &[u8], offset: usize) -> (f32, usize) {
    let end = offset + size_of::<f32>();
    (LittleEndian::read_f32(&buf[offset..end]), end)
}

pub fn retrieve_u32(buf: &[u8], offset: usize) -> (u32, usize) {
    let end = offset + size_of::<u32>();
    (LittleEndian::read_u32(&buf[offset..end]), end)
}

pub fn encode(controls: &ControlState) -> ControlPacket {
    let mut buf = [0_u8; CONTROL_PACKET_SIZE];
    let mut offset = append_f32(&mut buf, 0, controls.throttle);
    offset = append_f32(&mut buf, offset, controls.steer);
    offset = append_f32(&mut buf, offset, controls.pitch);
    offset = append_f32(&mut buf, offset, controls.yaw);
    offset = append_f32(&mut buf, offset, controls.roll);
    // dodge forward / dodge right
    offset = append_f32(&mut buf, offset, -controls.pitch);
    offset = append_f32(&mut buf, offset, controls.yaw);

    let mut flags = 0;
    if controls.handbrake {
        flags |= HANDBRAKE_BIT;
    }
    if controls.jump {
        flags |= JUMP_BIT;
    }
    if controls.boost {
        flags |= BOOST_BIT | BOOST_DUPLICATE_BIT;
    }
    if controls.use_item {
        flags |= USE_ITEM_BIT;
    }
    append_u32(&mut buf, offset, flags);
    ControlPacket(buf)
}

pub fn encode_action(action: &Action) -> ControlPacket {
    encode(&ControlState::from(action))
}

/// Reads a packet back into controller state. The dodge fields are derived and not returned.
pub fn decode(packet: &ControlPacket) -> ControlState {
    let buf = &packet.0[..];
    let (throttle, offset) = retrieve_f32(buf, 0);
    let (steer, offset) = retrieve_f32(buf, offset);
    let (pitch, offset) = retrieve_f32(buf, offset);
    let (yaw, offset) = retrieve_f32(buf, offset);
    let (roll, offset) = retrieve_f32(buf, offset);
    let (flags, _) = retrieve_u32(buf, offset + 2 * size_of::<f32>());
    ControlState {
        throttle,
        steer,
        pitch,
        yaw,
        roll,
        jump: flags & JUMP_BIT != 0,
        boost: flags & BOOST_BIT != 0,
        handbrake: flags & HANDBRAKE_BIT != 0,
        use_item: flags & USE_ITEM_BIT != 0,
    }
}
