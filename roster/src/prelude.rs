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

pub use roster_common::{
    clock::{Clock, ManualClock, SystemClock},
    error::{Error, ErrorKind, Result},
    id_set::IdSet,
    snowflake::Id,
    spawn::Spawner,
};
pub use roster_memory::{BoxCacheView, CacheView, Mandatory, Placeholder, Resolve};

pub use crate::{
    builder::{RegistryBuilder, RegistryConfig},
    fetch::{Fetch, Fetcher, NoopFetcher},
    model::{
        ActivityEmoji, ActivityType, Channel, ChannelType, ClientStatus, Emoji, EmojiKey, Guild, GuildChannel,
        Invite, KnownCustomEmoji, Member, MemberPresence, Message, OwnUser, PermissionOverwrite, Permissions,
        PrivateChannel, Reaction, RichActivity, Role, Status, User, VoiceState,
    },
    registry::Registry,
};
