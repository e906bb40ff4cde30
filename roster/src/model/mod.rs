// Copyright 2026 roster Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Public entities handed to application code.
//!
//! Every entity is a plain owned value. Values obtained from the registry are copies: mutating them never
//! changes the cache.

mod channel;
mod emoji;
mod guild;
mod invite;
mod message;
mod permissions;
mod presence;
mod user;
mod voice;

pub use channel::{Channel, ChannelType, GuildChannel, OverwriteType, PermissionOverwrite, PrivateChannel};
pub use emoji::{ActivityEmoji, Emoji, EmojiKey, KnownCustomEmoji};
pub use guild::{Guild, Member, Role};
pub use invite::Invite;
pub use message::{Message, Reaction};
pub use permissions::Permissions;
pub use presence::{ActivityType, ClientStatus, MemberPresence, RichActivity, Status};
pub use user::{OwnUser, User};
pub use voice::VoiceState;
