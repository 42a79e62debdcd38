use crate::gateway::{Direction, Embed, Filter, SelectQuery};
use crate::model::{tables, FeedScope, Post, UserId, Visibility};

/// Relations hydrated on every post: author profile, like and comment totals,
/// and the viewer's own like row when there is a viewer.
pub(crate) fn post_embeds(viewer: Option<&UserId>) -> Vec<Embed> {
    let mut embeds = vec![
        Embed::one("author", tables::PROFILES, "user_id"),
        Embed::count("like_total", tables::LIKES, "post_id"),
        Embed::count("comment_total", tables::COMMENTS, "post_id"),
    ];
    if let Some(viewer) = viewer {
        embeds.push(
            Embed::many("viewer_like", tables::LIKES, "post_id", &["user_id"])
                .with_filter(Filter::eq("user_id", viewer.as_str())),
        );
    }
    embeds
}

/// One page of a feed, newest first.
pub(crate) fn page_query(
    scope: &FeedScope,
    viewer: Option<&UserId>,
    offset: usize,
    limit: usize,
) -> SelectQuery {
    let mut query = SelectQuery::from(tables::POSTS);
    query = match scope {
        FeedScope::Global => query
            .filter(Filter::is_null("community_id"))
            .filter(Filter::eq("visibility", "public")),
        FeedScope::Community(id) => query.filter(Filter::eq("community_id", id.as_str())),
    };
    for embed in post_embeds(viewer) {
        query = query.embed(embed);
    }
    query
        .order_by("created_at", Direction::Descending)
        .range(offset, limit)
}

/// Whether `post` would be returned by [`page_query`] for `scope`.
pub(crate) fn in_scope(scope: &FeedScope, post: &Post) -> bool {
    match scope {
        FeedScope::Global => post.community_id.is_none() && post.visibility == Visibility::Public,
        FeedScope::Community(id) => post.community_id.as_ref() == Some(id),
    }
}
