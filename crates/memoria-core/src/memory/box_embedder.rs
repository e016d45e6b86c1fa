//! Type-erased [`Embedder`], built the same way as `BoxLlmProvider`.

use std::future::Future;
use std::pin::Pin;

use memoria_types::error::EmbeddingError;

use super::embedder::Embedder;

type EmbedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send + 'a>>;

pub trait ErasedEmbedder: Send + Sync {
    fn erased_embed<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a>;
    fn erased_model_name(&self) -> &str;
    fn erased_dimension(&self) -> usize;
}

impl<E: Embedder> ErasedEmbedder for E {
    fn erased_embed<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        Box::pin(self.embed(texts))
    }

    fn erased_model_name(&self) -> &str {
        self.model_name()
    }

    fn erased_dimension(&self) -> usize {
        self.dimension()
    }
}

pub struct BoxEmbedder(Box<dyn ErasedEmbedder>);

impl BoxEmbedder {
    pub fn new<E: Embedder + 'static>(embedder: E) -> Self {
        Self(Box::new(embedder))
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.0.erased_embed(texts).await
    }

    /// Embed one text and check the vector has the advertised dimension.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        let vector = vectors.swap_remove(0);
        let expected = self.dimension();
        if vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    pub fn model_name(&self) -> &str {
        self.0.erased_model_name()
    }

    pub fn dimension(&self) -> usize {
        self.0.erased_dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder {
        dimension: usize,
        produced: usize,
    }

    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![0.5; self.produced]).collect())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    #[tokio::test]
    async fn test_embed_one_checks_dimension() {
        let good = BoxEmbedder::new(FixedEmbedder {
            dimension: 3,
            produced: 3,
        });
        assert_eq!(good.embed_one("tea").await.unwrap().len(), 3);
        assert_eq!(good.model_name(), "fixed");

        let bad = BoxEmbedder::new(FixedEmbedder {
            dimension: 3,
            produced: 2,
        });
        assert!(matches!(
            bad.embed_one("tea").await,
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
